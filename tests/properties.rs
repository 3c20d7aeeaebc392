use chip8vm::display::{HEIGHT, WIDTH};
use chip8vm::machine::{ADDR_MASK, FLAG, LOAD_ADDR, MAX_PROGRAM_BYTES, STACK_DEPTH};
use chip8vm::{Chip8, Config, Fault, LoadError};
use proptest::prelude::*;

fn seeded() -> Chip8 {
    Chip8::with_config(&Config {
        seed: Some(1),
        ..Config::default()
    })
}

proptest! {
    #[test]
    fn load_copies_program_and_rewinds(program in prop::collection::vec(any::<u8>(), 1..=MAX_PROGRAM_BYTES)) {
        let mut chip8 = seeded();
        chip8.machine_mut().pc = 0x400;
        chip8.load(&program).unwrap();
        let start = LOAD_ADDR as usize;
        prop_assert_eq!(&chip8.machine().memory[start..start + program.len()], &program[..]);
        prop_assert_eq!(chip8.machine().pc, LOAD_ADDR);
    }

    #[test]
    fn oversized_load_changes_nothing(extra in 1usize..64) {
        let mut chip8 = seeded();
        let before = chip8.machine().clone();
        let err = chip8.load(&vec![0xAB; MAX_PROGRAM_BYTES + extra]).unwrap_err();
        prop_assert_eq!(err, LoadError::TooLarge { len: MAX_PROGRAM_BYTES + extra, max: MAX_PROGRAM_BYTES });
        prop_assert_eq!(chip8.machine(), &before);
    }

    #[test]
    fn alu_results_match_wrapping_arithmetic(op in 0u8..=7, x in 0usize..=0xE, vx in any::<u8>(), vy in any::<u8>()) {
        // 8XY0..8XY7 with Y=F and X anywhere below it; 8XY3 is XOR, 8XY6 is SHR
        let y = FLAG;
        let mut chip8 = seeded();
        chip8.load(&[0x80 | x as u8, 0xF0 | op]).unwrap();
        chip8.machine_mut().registers[x] = vx;
        chip8.machine_mut().registers[y] = vy;
        chip8.cycle().unwrap();

        let regs = chip8.machine().registers;
        let (result, flag) = match op {
            0 => (vy, None),
            1 => (vx | vy, None),
            2 => (vx & vy, None),
            3 => (vx ^ vy, None),
            4 => (vx.wrapping_add(vy), Some(u8::from(vx as u16 + vy as u16 > 0xFF))),
            5 => (vx.wrapping_sub(vy), Some(u8::from(vx >= vy))),
            6 => (vx >> 1, Some(vx & 1)),
            _ => (vy.wrapping_sub(vx), Some(u8::from(vy >= vx))),
        };
        prop_assert_eq!(regs[x], result);
        prop_assert_eq!(regs[FLAG], flag.unwrap_or(vy));
        prop_assert_eq!(chip8.machine().pc, LOAD_ADDR + 2);
    }

    #[test]
    fn alu_into_vf_follows_write_order(op in prop::sample::select(vec![4u8, 5, 6, 7, 0xE]), vf in any::<u8>(), vy in any::<u8>()) {
        // 8FY_ with Y=1: add and subtract leave the flag, shifts leave the shifted flag
        let mut chip8 = seeded();
        chip8.load(&[0x8F, 0x10 | op]).unwrap();
        chip8.machine_mut().registers[FLAG] = vf;
        chip8.machine_mut().registers[1] = vy;
        chip8.cycle().unwrap();

        let expected = match op {
            4 => u8::from(vf as u16 + vy as u16 > 0xFF),
            5 => u8::from(vf >= vy),
            6 => (vf & 1) >> 1,
            7 => u8::from(vy >= vf),
            _ => (vf >> 7) << 1,
        };
        prop_assert_eq!(chip8.machine().registers[FLAG], expected);
    }

    #[test]
    fn add_to_index_stays_in_address_space(index in 0u16..=ADDR_MASK, vx in any::<u8>()) {
        let mut chip8 = seeded();
        chip8.load(&[0xF3, 0x1E]).unwrap();
        chip8.machine_mut().index = index;
        chip8.machine_mut().registers[3] = vx;
        chip8.cycle().unwrap();
        let sum = index + vx as u16;
        prop_assert!(chip8.machine().index <= ADDR_MASK);
        prop_assert_eq!(chip8.machine().index, sum & ADDR_MASK);
        prop_assert_eq!(chip8.machine().registers[FLAG], u8::from(sum > ADDR_MASK));
    }

    #[test]
    fn drawing_twice_restores_display(
        x in 0u8..=255,
        y in 0u8..=255,
        sprite in prop::collection::vec(any::<u8>(), 1..=15),
        lit in prop::collection::vec((0..WIDTH, 0..HEIGHT), 0..200),
    ) {
        let n = sprite.len() as u8;
        let mut code = vec![
            0x60, x, // V0 = x
            0x61, y, // V1 = y
            0xA2, 0x10, // I = 0x210
            0xD0, 0x10 | n, // draw
            0xD0, 0x10 | n, // draw again
        ];
        code.resize(0x10, 0);
        code.extend_from_slice(&sprite);

        let mut chip8 = seeded();
        chip8.load(&code).unwrap();
        for &(cx, cy) in &lit {
            chip8.display_mut().toggle(cx, cy);
        }
        let before = chip8.display().snapshot();

        // cells the sprite covers, wrapped; rows never overlap since n < HEIGHT
        let covered: Vec<(usize, usize)> = sprite
            .iter()
            .enumerate()
            .flat_map(|(row, &bits)| {
                (0..8usize)
                    .filter(move |&col| bits & (0x80u8 >> col) != 0)
                    .map(move |col| ((x as usize + col) % WIDTH, (y as usize + row) % HEIGHT))
            })
            .collect();
        let first_flag = covered.iter().any(|&(cx, cy)| before[cy][cx] == 1);

        chip8.run_cycles(4).unwrap();
        prop_assert_eq!(chip8.machine().registers[FLAG], u8::from(first_flag));
        for &(cx, cy) in &covered {
            prop_assert_eq!(chip8.display().is_set(cx, cy), before[cy][cx] == 0);
        }

        // the second draw collides exactly where the first draw set a cell
        let second_flag = covered.iter().any(|&(cx, cy)| before[cy][cx] == 0);
        chip8.cycle().unwrap();
        prop_assert_eq!(chip8.display().snapshot(), before);
        prop_assert_eq!(chip8.machine().registers[FLAG], u8::from(second_flag));
    }

    #[test]
    fn call_depth_is_bounded(depth in 1usize..=STACK_DEPTH + 4) {
        // a chain of calls, each to the next word
        let mut code = Vec::new();
        for i in 0..depth {
            let call = 0x2000 | (LOAD_ADDR + 2 * (i as u16 + 1));
            code.extend_from_slice(&call.to_be_bytes());
        }
        let mut chip8 = seeded();
        chip8.load(&code).unwrap();
        let result = chip8.run_cycles(depth as u32);
        if depth <= STACK_DEPTH {
            prop_assert!(result.is_ok());
            prop_assert_eq!(chip8.machine().stack.depth(), depth);
        } else {
            let pc = LOAD_ADDR + 2 * STACK_DEPTH as u16;
            prop_assert_eq!(result, Err(Fault::CallStackOverflow { pc, opcode: 0x2000 | (pc + 2) }));
            prop_assert_eq!(chip8.machine().stack.depth(), STACK_DEPTH);
            prop_assert_eq!(chip8.machine().pc, pc);
        }
    }
}
