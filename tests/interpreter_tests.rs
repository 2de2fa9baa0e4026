//! Running assembled programs end to end

mod common;

use common::{build_image, load, load_with, op, simple_image, Arg, Assembler, DISCARD};
use ifvm::{Error, ErrorKind, MachineConfig, RecordingHost};
use std::rc::Rc;

/// Where RAM begins for programs shorter than 220 bytes
const RAM_START: u32 = 0x100;

fn run(asm: &Assembler, start: u32) -> Result<u32, Error> {
    let (mut vm, _) = load(&simple_image(asm, start));
    vm.run()
}

#[test]
fn test_return_constant() {
    let mut asm = Assembler::new();
    let main = asm.stack_function(&[]);
    asm.op(op::RETURN, &[Arg::Const(42)]).end();

    assert_eq!(run(&asm, main).unwrap(), 42);
}

#[test]
fn test_return_sum() {
    let mut asm = Assembler::new();
    let main = asm.stack_function(&[]);
    asm.op(op::ADD, &[Arg::Const(19), Arg::Const(23), Arg::Stack])
        .op(op::RETURN, &[Arg::Stack])
        .end();

    assert_eq!(run(&asm, main).unwrap(), 42);
}

#[test]
fn test_signed_division() {
    for (opcode, expected) in [(op::DIV, -3), (op::MOD, -1)] {
        let mut asm = Assembler::new();
        let main = asm.stack_function(&[]);
        asm.op(opcode, &[Arg::Const(-7), Arg::Const(2), Arg::Stack])
            .op(op::RETURN, &[Arg::Stack])
            .end();

        assert_eq!(run(&asm, main).unwrap() as i32, expected);
    }
}

#[test]
fn test_division_by_zero() {
    let mut asm = Assembler::new();
    let main = asm.stack_function(&[]);
    asm.op(op::DIV, &[Arg::Const(1), Arg::Const(0), Arg::Stack])
        .op(op::RETURN, &[Arg::Stack])
        .end();

    assert_eq!(run(&asm, main).unwrap_err(), Error::DivisionByZero);
}

#[test]
fn test_neg_and_sign_extension() {
    let mut asm = Assembler::new();
    let main = asm.stack_function(&[]);
    // neg(sexb(0xFF)) == 1
    asm.op(op::SEXB, &[Arg::Const(0xFF), Arg::Stack])
        .op(op::NEG, &[Arg::Stack, Arg::Stack])
        .op(op::RETURN, &[Arg::Stack])
        .end();

    assert_eq!(run(&asm, main).unwrap(), 1);
}

#[test]
fn test_local_argument_function() {
    let mut asm = Assembler::new();
    let f = asm.local_function(&[(4, 2)]);
    asm.op(op::SUB, &[Arg::Local(0), Arg::Local(4), Arg::Stack])
        .op(op::RETURN, &[Arg::Stack])
        .end();

    let (mut vm, _) = load(&simple_image(&asm, f));
    let machine = vm.machine_mut();
    assert_eq!(machine.call_function(f, &[50, 8]).unwrap(), 42);
    // Extra arguments are dropped, missing ones stay zero
    assert_eq!(machine.call_function(f, &[50, 8, 99]).unwrap(), 42);
    assert_eq!(machine.call_function(f, &[50]).unwrap(), 50);
}

#[test]
fn test_stack_argument_function() {
    let mut asm = Assembler::new();
    let count = asm.stack_function(&[]);
    asm.op(op::RETURN, &[Arg::Stack]).end();

    let difference = asm.stack_function(&[]);
    asm.op(op::COPY, &[Arg::Stack, DISCARD])
        .op(op::SUB, &[Arg::Stack, Arg::Stack, Arg::Stack])
        .op(op::RETURN, &[Arg::Stack])
        .end();

    let (mut vm, _) = load(&simple_image(&asm, count));
    let machine = vm.machine_mut();
    assert_eq!(machine.call_function(count, &[7, 8, 9]).unwrap(), 3);
    assert_eq!(machine.call_function(difference, &[50, 8]).unwrap(), 42);
    assert_eq!(machine.stack().pointer(), 0);
}

#[test]
fn test_guest_calls() {
    let mut asm = Assembler::new();
    let sub = asm.local_function(&[(4, 2)]);
    asm.op(op::SUB, &[Arg::Local(0), Arg::Local(4), Arg::Stack])
        .op(op::RETURN, &[Arg::Stack])
        .end();

    let main = asm.local_function(&[(4, 1)]);
    let target = sub as i32;
    asm.op(op::CALLFII, &[Arg::Const(target), Arg::Const(40), Arg::Const(2), Arg::Local(0)])
        // The first argument is the top of the stack
        .op(op::COPY, &[Arg::Const(2), Arg::Stack])
        .op(op::COPY, &[Arg::Const(40), Arg::Stack])
        .op(op::CALL, &[Arg::Const(target), Arg::Const(2), Arg::Stack])
        .op(op::ADD, &[Arg::Local(0), Arg::Stack, Arg::Stack])
        .op(op::RETURN, &[Arg::Stack])
        .end();

    // (40 - 2) + (40 - 2)
    let (mut vm, _) = load(&simple_image(&asm, main));
    assert_eq!(vm.run().unwrap(), 76);
    assert_eq!(vm.machine().stack().pointer(), 0);
    assert_eq!(vm.machine().call_depth(), 0);
}

#[test]
fn test_call_with_argument_count_in_local() {
    let mut asm = Assembler::new();
    let count = asm.stack_function(&[]);
    asm.op(op::RETURN, &[Arg::Stack]).end();

    let main = asm.local_function(&[(4, 1)]);
    asm.op(op::COPY, &[Arg::Const(3), Arg::Local(0)])
        .op(op::COPY, &[Arg::Const(1), Arg::Stack])
        .op(op::COPY, &[Arg::Const(2), Arg::Stack])
        .op(op::COPY, &[Arg::Const(3), Arg::Stack])
        .op(op::CALL, &[Arg::Const(count as i32), Arg::Local(0), Arg::Stack])
        .op(op::RETURN, &[Arg::Stack])
        .end();

    assert_eq!(run(&asm, main).unwrap(), 3);
}

#[test]
fn test_negative_argument_count_underflows() {
    let mut asm = Assembler::new();
    let count = asm.stack_function(&[]);
    asm.op(op::RETURN, &[Arg::Stack]).end();

    let main = asm.local_function(&[]);
    asm.op(op::COPY, &[Arg::Const(1), Arg::Stack])
        .op(op::CALL, &[Arg::Const(count as i32), Arg::Const(-1), Arg::Stack])
        .op(op::RETURN, &[Arg::Stack])
        .end();

    let (mut vm, _) = load(&simple_image(&asm, main));
    assert_eq!(
        vm.run().unwrap_err(),
        Error::StackUnderflow {
            pointer: 4,
            size: u32::MAX
        }
    );
    assert_eq!(vm.machine().stack().pointer(), 0);
    assert!(!vm.machine().is_cached(count));
}

#[test]
fn test_counting_loop() {
    let mut asm = Assembler::new();
    let main = asm.local_function(&[(4, 2)]);
    let (i, sum) = (Arg::Local(0), Arg::Local(4));

    asm.op(op::COPY, &[Arg::Const(1), i])
        .op(op::COPY, &[Arg::Const(0), sum]);
    let top = asm.address();
    let done = asm.branch(op::JGT, &[i, Arg::Const(10)]);
    asm.op(op::ADD, &[sum, i, sum]).op(op::ADD, &[i, Arg::Const(1), i]);
    let back = asm.branch(op::JUMP, &[]);
    asm.patch(back, top);
    asm.bind(done);
    asm.op(op::RETURN, &[sum]).end();

    assert_eq!(run(&asm, main).unwrap(), 55);
}

#[test]
fn test_branch_offset_returns() {
    let mut asm = Assembler::new();
    let main = asm.stack_function(&[]);
    asm.op(op::JEQ, &[Arg::Const(3), Arg::Const(3), Arg::Const(1)])
        .op(op::RETURN, &[Arg::Const(7)])
        .end();

    assert_eq!(run(&asm, main).unwrap(), 1);
}

#[test]
fn test_ram_access() {
    let mut asm = Assembler::new();
    let main = asm.stack_function(&[]);
    asm.op(op::COPY, &[Arg::Const(1000), Arg::Ram(8)])
        .op(op::ASTORE, &[Arg::Const(RAM_START as i32), Arg::Const(1), Arg::Const(5)])
        .op(op::ALOADB, &[Arg::Const(0), Arg::Const(3), Arg::Stack])
        .op(op::COPYB, &[Arg::Ram(1), Arg::Stack])
        .op(op::ADD, &[Arg::Stack, Arg::Stack, Arg::Stack])
        .op(op::ADD, &[Arg::Ram(8), Arg::Stack, Arg::Stack])
        .op(op::RETURN, &[Arg::Stack])
        .end();

    // RAM starts with bytes 00 2A 00 ...; aloadb reads header byte 3 (0x6C)
    let image = build_image(&asm, main, &[0x00, 0x2A], 1024);
    assert_eq!(image.ram_start, RAM_START);
    let (mut vm, _) = load(&image);
    assert_eq!(vm.run().unwrap(), 1000 + 0x2A + 0x6C);

    let memory = vm.machine().memory();
    assert_eq!(memory.read_dword(RAM_START + 4).unwrap(), 5);
    assert_eq!(memory.read_dword(RAM_START + 8).unwrap(), 1000);
}

#[test]
fn test_write_to_rom_fails() {
    let mut asm = Assembler::new();
    let main = asm.stack_function(&[]);
    asm.op(op::COPY, &[Arg::Const(1), Arg::Addr(0x10)])
        .op(op::RETURN, &[Arg::Const(0)])
        .end();

    let err = run(&asm, main).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ReadOnlyViolation);
}

#[test]
fn test_get_memory_size() {
    let mut asm = Assembler::new();
    let main = asm.stack_function(&[]);
    asm.op(op::GETMEMSIZE, &[Arg::Stack])
        .op(op::RETURN, &[Arg::Stack])
        .end();

    let image = simple_image(&asm, main);
    let (mut vm, _) = load(&image);
    assert_eq!(vm.run().unwrap(), image.end_mem);
}

#[test]
fn test_output_streams() {
    let mut asm = Assembler::new();
    let greeting = asm.string("hi ");
    let main = asm.stack_function(&[]);
    asm.op(op::STREAMSTR, &[Arg::Const(greeting as i32)])
        .op(op::STREAMCHAR, &[Arg::Const('H' as i32)])
        .op(op::STREAMNUM, &[Arg::Const(-12)])
        .op(op::STREAMUNICHAR, &[Arg::Const(0x263A)])
        .op(op::RETURN, &[Arg::Const(0)])
        .end();

    let (mut vm, host) = load(&simple_image(&asm, main));
    vm.run().unwrap();
    assert_eq!(host.output(), "hi H-12\u{263A}");
}

#[test]
fn test_compressed_string_is_unsupported() {
    let mut asm = Assembler::new();
    let compressed = asm.raw(&[0xE1, 0x00]);
    let main = asm.stack_function(&[]);
    asm.op(op::STREAMSTR, &[Arg::Const(compressed as i32)])
        .op(op::RETURN, &[Arg::Const(0)])
        .end();

    assert_eq!(
        run(&asm, main).unwrap_err(),
        Error::UnsupportedStringType {
            address: compressed,
            type_byte: 0xE1
        }
    );
}

#[test]
fn test_glk_dispatch() {
    let mut asm = Assembler::new();
    let main = asm.stack_function(&[]);
    asm.op(op::COPY, &[Arg::Const(5), Arg::Stack])
        .op(op::COPY, &[Arg::Const(7), Arg::Stack])
        .op(op::GLK, &[Arg::Const(0x80), Arg::Const(2), Arg::Stack])
        .op(op::RETURN, &[Arg::Stack])
        .end();

    let image = simple_image(&asm, main);
    let (mut vm, host) = load_with(
        &image,
        RecordingHost::new().with_glk_result(9),
        MachineConfig::default(),
    );
    assert_eq!(vm.run().unwrap(), 9);
    assert_eq!(host.glk_calls(), vec![(0x80, vec![7, 5])]);
    assert_eq!(vm.machine().stack().pointer(), 0);
}

#[test]
fn test_restore_undo_reaches_host() {
    let mut asm = Assembler::new();
    let main = asm.stack_function(&[]);
    asm.op(op::RESTOREUNDO, &[Arg::Stack])
        .op(op::RETURN, &[Arg::Const(1)])
        .end();

    let (mut vm, host) = load(&simple_image(&asm, main));
    assert_eq!(vm.run().unwrap(), 1);
    assert_eq!(host.log().undo_requests, 1);
}

#[test]
fn test_quit_unwinds_callers() {
    let mut asm = Assembler::new();
    let stop = asm.stack_function(&[]);
    asm.op(op::QUIT, &[]).end();

    let main = asm.stack_function(&[]);
    asm.op(op::CALLF, &[Arg::Const(stop as i32), DISCARD])
        .op(op::STREAMCHAR, &[Arg::Const('x' as i32)])
        .op(op::RETURN, &[Arg::Const(7)])
        .end();

    let (mut vm, host) = load(&simple_image(&asm, main));
    assert_eq!(vm.run().unwrap(), 0);
    assert!(vm.machine().is_halted());
    assert_eq!(host.output(), "");
}

#[test]
fn test_functions_are_decoded_once() {
    let mut asm = Assembler::new();
    let helper = asm.stack_function(&[]);
    asm.op(op::RETURN, &[Arg::Const(1)]).end();
    let main = asm.stack_function(&[]);
    asm.op(op::CALLF, &[Arg::Const(helper as i32), Arg::Stack])
        .op(op::RETURN, &[Arg::Stack])
        .end();

    let (mut vm, _) = load(&simple_image(&asm, main));
    assert!(vm.machine().is_cached(main));
    assert!(!vm.machine().is_cached(helper));

    vm.run().unwrap();
    assert!(vm.machine().is_cached(helper));

    let first = vm.function(helper).unwrap();
    let second = vm.function(helper).unwrap();
    assert!(Rc::ptr_eq(&first, &second));
}

#[test]
fn test_recursion_hits_call_depth_limit() {
    let mut asm = Assembler::new();
    let main = asm.stack_function(&[]);
    asm.op(op::CALLF, &[Arg::Const(main as i32), Arg::Stack])
        .op(op::RETURN, &[Arg::Stack])
        .end();

    let config = MachineConfig {
        max_call_depth: 32,
        ..MachineConfig::default()
    };
    let (mut vm, _) = load_with(&simple_image(&asm, main), RecordingHost::new(), config);

    assert_eq!(
        vm.run().unwrap_err(),
        Error::CallDepthExceeded { limit: 32 }
    );
    assert_eq!(vm.machine().call_depth(), 0);
    assert_eq!(vm.machine().stack().pointer(), 0);
}

#[test]
fn test_unbounded_recursion_stops_at_default_depth() {
    let mut asm = Assembler::new();
    let main = asm.local_function(&[]);
    asm.op(op::CALLF, &[Arg::Const(main as i32), Arg::Stack])
        .op(op::RETURN, &[Arg::Stack])
        .end();

    // Runs on the regular test thread; guest frames must not use the host stack
    let (mut vm, _) = load(&simple_image(&asm, main));
    let limit = MachineConfig::default().max_call_depth;

    assert_eq!(vm.run().unwrap_err(), Error::CallDepthExceeded { limit });
    assert_eq!(vm.machine().call_depth(), 0);
    assert_eq!(vm.machine().stack().pointer(), 0);
}

/// `sum(n)` computed as `n + sum(n - 1)`, one guest frame per step
fn recursive_sum() -> (Assembler, u32) {
    let mut asm = Assembler::new();
    let sum = asm.local_function(&[(4, 1)]);
    asm.op(op::JZ, &[Arg::Local(0), Arg::Const(0)])
        .op(op::SUB, &[Arg::Local(0), Arg::Const(1), Arg::Stack])
        .op(op::CALLFI, &[Arg::Const(sum as i32), Arg::Stack, Arg::Stack])
        .op(op::ADD, &[Arg::Local(0), Arg::Stack, Arg::Stack])
        .op(op::RETURN, &[Arg::Stack])
        .end();
    (asm, sum)
}

#[test]
fn test_recursion_up_to_default_depth() {
    let (asm, sum) = recursive_sum();
    let (mut vm, _) = load(&simple_image(&asm, sum));
    let machine = vm.machine_mut();

    // 1000 frames: sum(999) down to sum(0)
    assert_eq!(machine.call_function(sum, &[999]).unwrap(), 499_500);
    assert_eq!(machine.call_depth(), 0);

    assert_eq!(
        machine.call_function(sum, &[1000]).unwrap_err(),
        Error::CallDepthExceeded { limit: 1000 }
    );
    assert_eq!(machine.call_depth(), 0);
    assert_eq!(machine.stack().pointer(), 0);

    // The machine is still usable after unwinding
    assert_eq!(machine.call_function(sum, &[10]).unwrap(), 55);
}

#[test]
fn test_infinite_loop_hits_step_limit() {
    let mut asm = Assembler::new();
    let main = asm.stack_function(&[]);
    let top = asm.address();
    let back = asm.branch(op::JUMP, &[]);
    asm.patch(back, top);
    asm.end();

    let config = MachineConfig {
        max_steps: Some(100),
        ..MachineConfig::default()
    };
    let (mut vm, _) = load_with(&simple_image(&asm, main), RecordingHost::new(), config);

    let err = vm.run().unwrap_err();
    assert_eq!(err, Error::StepLimitExceeded { limit: 100 });
    assert_eq!(err.kind(), ErrorKind::Limit);
}
