use super::*;
use crate::fixedmath::table_index;
use crate::registry::WavetableData;

/// Render one wavetable.  An empty table is silent, but the phase still
/// advances so a later table swap stays in step.  The storage format is
/// matched once here, each arm running its own inner loop.
pub(super) fn render(
    table: &Wavetable,
    mix: &mut [i32],
    ramp: &EnvRamp,
    gain: Gain,
    phase: &mut u32,
    inc: u32,
) {
    if table.is_empty() {
        *phase = phase.wrapping_add(inc.wrapping_mul(mix.len() as u32));
        return;
    }
    let size = table.size();
    match table.data() {
        WavetableData::Bits16(d) => run_phase(mix, ramp, gain, phase, inc, |ph| d[table_index(ph, size)] as i32),
        WavetableData::Bits8(d) => run_phase(mix, ramp, gain, phase, inc, |ph| {
            (d[table_index(ph, size)] as i32 - 128) << 8
        }),
        WavetableData::Bits4(d) => run_phase(mix, ramp, gain, phase, inc, |ph| {
            let idx = table_index(ph, size);
            let nibble = (d[idx >> 1] >> ((idx & 1) << 2)) & 0xF;
            (nibble as i32 - 8) << 12
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixedmath::phase_increment;

    const FULL: EnvRamp = EnvRamp {
        start: ENV_MAX,
        step: 0,
        ended: false,
    };

    #[test]
    fn one_cycle_per_hundred_samples() {
        // 480 Hz at 48 kHz over a 100 entry table
        let data: [i16; 100] = core::array::from_fn(|i| i as i16 * 100);
        let table = Wavetable::new_16(&data);
        // rounded up so every entry lands exactly on its own sample
        let inc = phase_increment(48000, 48000) + 1;
        let mut seen = [0u32; 100];
        let mut ph = 0u32;
        for _ in 0..100 {
            seen[table_index(ph, table.size())] += 1;
            ph = ph.wrapping_add(inc);
        }
        assert!(seen.iter().all(|&n| n == 1));

        let mut mix = [0i32; 100];
        let mut phase = 0u32;
        render(&table, &mut mix, &FULL, Gain::new(255, 255), &mut phase, inc);
        // wrapped back to the start, off only by the rounding of the increment
        assert!(phase < 100);
        for (i, m) in mix.iter().enumerate() {
            assert_eq!(*m, (data[i] as i32 * 65024) >> 16);
        }
    }
    #[test]
    fn four_bit_table() {
        // 0, 15, 8, 8 as nibbles
        let data = [0xF0u8, 0x88];
        let table = Wavetable::new_4(&data, 4);
        let mut mix = [0i32; 4];
        let mut phase = 0u32;
        render(&table, &mut mix, &FULL, Gain::new(255, 255), &mut phase, 1 << 30);
        assert!(mix[0] < 0);
        assert!(mix[1] > 0);
        assert_eq!(&mix[2..], &[0, 0]);
    }
    #[test]
    fn every_depth_matches_lookup() {
        let wide: [i16; 8] = [-32768, -20000, -4000, 0, 1, 9000, 21000, 32767];
        let narrow: [u8; 8] = [0, 30, 100, 128, 129, 180, 230, 255];
        let packed = [0x10u8, 0x32, 0xA8, 0xFE];
        let tables = [Wavetable::new_16(&wide), Wavetable::new_8(&narrow), Wavetable::new_4(&packed, 8)];
        let inc = 1 << 29;
        for table in &tables {
            let mut mix = [0i32; 16];
            let mut phase = 0u32;
            render(table, &mut mix, &FULL, Gain::new(255, 255), &mut phase, inc);
            for (i, m) in mix.iter().enumerate() {
                let expect = table.at_phase((i as u32).wrapping_mul(inc)) as i32;
                assert_eq!(*m, (expect * 65024) >> 16, "{:?} at {}", table.depth(), i);
            }
        }
    }
    #[test]
    fn empty_table_is_silent() {
        let data: [i16; 0] = [];
        let table = Wavetable::new_16(&data);
        let mut mix = [0i32; 8];
        let mut phase = 0u32;
        render(&table, &mut mix, &FULL, Gain::new(255, 255), &mut phase, 1000);
        assert_eq!(mix, [0; 8]);
        assert_eq!(phase, 8000);
    }
}
