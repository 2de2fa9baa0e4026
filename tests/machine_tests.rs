//! Image loading and machine state

mod common;

use common::{build_image, op, simple_image, Arg, Assembler};
use ifvm::glulx::CHECKSUM_OFFSET;
use ifvm::memory::{Memory, ValueStack};
use ifvm::{
    Error, ErrorKind, GlulxMachine, GlulxVersion, Machine, MachineConfig, NullHost, RecordingHost,
};

fn return_42() -> (Assembler, u32) {
    let mut asm = Assembler::new();
    let main = asm.stack_function(&[]);
    asm.op(op::RETURN, &[Arg::Const(42)]).end();
    (asm, main)
}

fn load(bytes: Vec<u8>) -> Result<GlulxMachine, Error> {
    GlulxMachine::new(bytes, Box::new(NullHost), MachineConfig::default())
}

#[test]
fn test_memory_read_only_region() {
    let mut memory = Memory::new(vec![0; 5]);
    memory.add_read_only_region(1, 3);

    for address in 1..4 {
        let err = memory.write_byte(address, 0xAA).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ReadOnlyViolation);
    }
    memory.write_byte(0, 0xAA).unwrap();
    memory.write_byte(4, 0xBB).unwrap();
    assert_eq!(memory.as_bytes(), &[0xAA, 0, 0, 0, 0xBB]);
}

#[test]
fn test_value_stack_limits() {
    let mut stack = ValueStack::new(1024);
    for _ in 0..1024 {
        stack.push_byte(1).unwrap();
    }
    assert!(matches!(
        stack.push_byte(1),
        Err(Error::StackOverflow { .. })
    ));

    let mut stack = ValueStack::new(1024);
    for byte in [0x12, 0x34, 0x56] {
        stack.push_byte(byte).unwrap();
    }
    assert!(matches!(
        stack.pop_dword(),
        Err(Error::StackUnderflow { pointer: 3, .. })
    ));

    stack.push_byte(0x78).unwrap();
    assert_eq!(stack.pop_dword().unwrap(), 0x1234_5678);
    assert_eq!(stack.pointer(), 0);
}

#[test]
fn test_load_lays_out_memory() {
    let (asm, main) = return_42();
    let image = build_image(&asm, main, &[1, 2, 3, 4], 2048);
    let vm = load(image.bytes.clone()).unwrap();

    let header = vm.header();
    assert_eq!(header.version, GlulxVersion::new(3, 1, 2));
    assert_eq!(header.ram_start, image.ram_start);
    assert_eq!(header.start_func, main);

    let machine = vm.machine();
    assert_eq!(machine.ram_start(), image.ram_start);
    assert_eq!(machine.memory().size(), image.end_mem);
    assert_eq!(machine.memory().read_dword(image.ram_start).unwrap(), 0x0102_0304);
    // Bytes past ExtStart start zeroed
    assert_eq!(machine.memory().read_dword(image.ext_start).unwrap(), 0);
    assert_eq!(machine.stack().capacity(), 2048);
    assert_eq!(machine.call_depth(), 0);
}

#[test]
fn test_ram_is_writable_and_rom_is_not() {
    let (asm, main) = return_42();
    let image = simple_image(&asm, main);
    let mut vm = load(image.bytes).unwrap();

    let memory = vm.machine_mut().memory_mut();
    memory.write_dword(image.ram_start, 7).unwrap();
    let err = memory.write_byte(image.ram_start - 1, 7).unwrap_err();
    assert!(matches!(err, Error::ReadOnlyViolation { start: 0, .. }));
}

#[test]
fn test_corrupted_image_is_rejected() {
    let (asm, main) = return_42();
    let mut bytes = simple_image(&asm, main).bytes;
    let last = bytes.len() - 1;
    bytes[last] ^= 0x80;

    let err = load(bytes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedImage);
    assert!(err.to_string().contains("checksum"));
}

#[test]
fn test_checksum_field_is_not_summed() {
    let (asm, main) = return_42();
    let mut bytes = simple_image(&asm, main).bytes;
    let at = CHECKSUM_OFFSET as usize;
    let stored = u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);

    // A wrong stored value is caught, the right one passes
    bytes[at..at + 4].copy_from_slice(&stored.wrapping_add(1).to_be_bytes());
    assert!(load(bytes.clone()).is_err());
    bytes[at..at + 4].copy_from_slice(&stored.to_be_bytes());
    assert!(load(bytes).is_ok());
}

#[test]
fn test_truncated_image_is_rejected() {
    let (asm, main) = return_42();
    let mut bytes = simple_image(&asm, main).bytes;
    bytes.truncate(bytes.len() - 256);

    let err = load(bytes).unwrap_err();
    assert!(matches!(err, Error::MalformedImage { .. }));
    assert!(err.to_string().contains("ExtStart"));
}

#[test]
fn test_not_a_glulx_image() {
    let mut bytes = b"TEXT".to_vec();
    bytes.resize(64, b' ');
    let err = load(bytes).unwrap_err();
    assert!(err.to_string().contains("not a glulx file"));
}

#[test]
fn test_stack_size_must_be_page_aligned() {
    let (asm, main) = return_42();
    let image = build_image(&asm, main, &[], 1000);
    let err = load(image.bytes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedImage);
}

#[test]
fn test_config_from_json_limits_machine() {
    let config = MachineConfig::from_json(r#"{"max_steps": 10}"#).unwrap();
    assert_eq!(config.max_call_depth, 1000);
    assert_eq!(config.max_steps, Some(10));

    assert!(matches!(
        MachineConfig::from_json(r#"{"max_call_depth": 0}"#),
        Err(Error::InvalidConfig(_))
    ));
}

#[test]
fn test_machine_debug_summarizes_state() {
    let machine = Machine::new(
        Memory::new(vec![0; 16]),
        ValueStack::new(256),
        8,
        Box::new(RecordingHost::new()),
    );
    let debug = format!("{:?}", machine);
    assert!(debug.contains("memory_size: 16"));
    assert!(debug.contains("ram_start: 8"));
    assert!(!machine.is_halted());
}

#[test]
fn test_direct_machine_call() {
    let mut asm = Assembler::at(0);
    let f = asm.local_function(&[(2, 1)]);
    asm.op(op::ADD, &[Arg::Local(0), Arg::Const(1), Arg::Stack])
        .op(op::RETURN, &[Arg::Stack])
        .end();

    let mut machine = Machine::new(asm.memory(), ValueStack::new(256), 0, Box::new(NullHost));
    // The word local keeps only the low 16 bits of its argument
    assert_eq!(machine.call_function(f, &[0x1_0041]).unwrap(), 0x42);
    assert!(machine.steps() > 0);
}
