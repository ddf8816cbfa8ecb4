//! Six concrete worked scenarios, each as its own integration test against
//! the public crate API: register copies, signed/unsigned comparison, an
//! unknown function code, opcode/function-code shape mismatches caught at
//! both encode time and run time, and a platform-specific function code.

use at_vm::codec::Timestamp;
use at_vm::function_code::FunctionCode;
use at_vm::host::test_helpers::NullHost;
use at_vm::prelude::*;

const THIRTY_TWO_BYTES: &[u8; 32] = b"This string is exactly 32 bytes!";
const FIN_IMD: u8 = 0x28;

fn ext_fun_dat(func: FunctionCode, cell: i32) -> Vec<u8> {
    let mut code = vec![0x32u8]; // EXT_FUN_DAT
    code.extend_from_slice(&func.raw().to_be_bytes());
    code.extend_from_slice(&cell.to_be_bytes());
    code
}

fn ext_fun(func: FunctionCode) -> Vec<u8> {
    let mut code = vec![0x31u8]; // EXT_FUN
    code.extend_from_slice(&func.raw().to_be_bytes());
    code
}

fn ext_fun_raw(raw_func: u16) -> Vec<u8> {
    let mut code = vec![0x31u8]; // EXT_FUN
    code.extend_from_slice(&raw_func.to_be_bytes());
    code
}

fn run_to_completion(state: &mut MachineState, host: &NullHost, limits: &Limits) {
    loop {
        match run_round(state, host, limits).unwrap() {
            RoundOutcome::NoOp if state.is_finished() => break,
            RoundOutcome::NoOp => panic!("program stalled without finishing"),
            RoundOutcome::Faulted => break,
            RoundOutcome::Completed if state.is_finished() => break,
            RoundOutcome::Completed => continue,
        }
    }
}

/// Scenario 1: copy a 32-byte block through the A/B registers.
#[test]
fn scenario_1_copy_via_a_b_registers() {
    let mut code = Vec::new();
    code.extend(ext_fun_dat(FunctionCode::SetADat, 2));
    code.extend(ext_fun(FunctionCode::SwapAAndB));
    code.extend(ext_fun_dat(FunctionCode::GetBDat, 6));
    code.push(FIN_IMD);

    let mut state = MachineState::new(code, 80, 32, 32, 0);
    state.put_data_block(2, *THIRTY_TWO_BYTES).unwrap();

    let host = NullHost {
        balance: 10_000,
        max_steps_per_round: 100,
        ..Default::default()
    };
    let limits = Limits::default();
    run_to_completion(&mut state, &host, &limits);

    assert!(state.is_finished());
    assert!(!state.had_fatal_error());
    assert_eq!(&state.get_data_block(6).unwrap(), THIRTY_TWO_BYTES);
}

/// Scenario 2: the same copy, but addressed indirectly through pointer cells.
#[test]
fn scenario_2_indirect_copy() {
    let mut code = Vec::new();
    code.extend(ext_fun_dat(FunctionCode::SetAInd, 0));
    code.extend(ext_fun(FunctionCode::SwapAAndB));
    code.extend(ext_fun_dat(FunctionCode::GetBInd, 1));
    code.push(FIN_IMD);

    let mut state = MachineState::new(code, 80, 32, 32, 0);
    state.put_data_long(0, 2).unwrap(); // dest_ptr for SET_A_IND -> cell 2
    state.put_data_long(1, 6).unwrap(); // dest_ptr for GET_B_IND -> cell 6
    state.put_data_block(2, *THIRTY_TWO_BYTES).unwrap();

    let host = NullHost {
        balance: 10_000,
        max_steps_per_round: 100,
        ..Default::default()
    };
    let limits = Limits::default();
    run_to_completion(&mut state, &host, &limits);

    assert!(state.is_finished());
    assert!(!state.had_fatal_error());
    assert_eq!(&state.get_data_block(6).unwrap(), THIRTY_TWO_BYTES);
}

/// Scenario 3: unsigned vs. signed 256-bit compare of the A/B registers,
/// fixing the A1/B1-least-significant limb order.
#[test]
fn scenario_3_unsigned_vs_signed_compare() {
    use at_vm::function_code::execute;

    let mut state = MachineState::new(vec![FIN_IMD], 8, 8, 8, 0);
    let host = NullHost::default();

    state.set_a_1(0x4444444444444444);
    state.set_a_2(0x3333333333333333);
    state.set_a_3(0xF222222222222222);
    state.set_a_4(0xF111111111111111);

    state.set_b_1(0xCCCCCCCCCCCCCCCC);
    state.set_b_2(0xDDDDDDDDDDDDDDDD);
    state.set_b_3(0x2222222222222222);
    state.set_b_4(0x1111111111111111);

    // A's most-significant limb (0xF111...) exceeds B's (0x1111...): A > B.
    let unsigned = execute(FunctionCode::UnsignedCompareAWithB, &[], &mut state, &host)
        .unwrap()
        .unwrap();
    assert_eq!(unsigned, 1);

    state.swap_a_and_b();
    let swapped = execute(FunctionCode::UnsignedCompareAWithB, &[], &mut state, &host)
        .unwrap()
        .unwrap();
    assert_eq!(swapped, -1);
    state.swap_a_and_b();

    state.set_b_bytes(state.get_a_bytes());
    let equal = execute(FunctionCode::UnsignedCompareAWithB, &[], &mut state, &host)
        .unwrap()
        .unwrap();
    assert_eq!(equal, 0);
}

/// Scenario 4: an unknown function code is a fatal, unrecoverable fault.
#[test]
fn scenario_4_invalid_function_code_is_fatal() {
    let mut code = ext_fun_raw(0xAAAA);
    code.push(FIN_IMD);

    let mut state = MachineState::new(code, 8, 8, 8, 0);
    let host = NullHost {
        balance: 10_000,
        max_steps_per_round: 100,
        ..Default::default()
    };
    let limits = Limits::default();

    let outcome = run_round(&mut state, &host, &limits).unwrap();
    assert_eq!(outcome, RoundOutcome::Faulted);
    assert!(state.is_finished());
    assert!(state.had_fatal_error());
}

/// Scenario 5: an opcode/function-code shape mismatch is rejected by the
/// assembler at encode time, and (if the mismatched bytes are injected
/// directly) by the executor as a fatal `IllegalFunctionCode` at run time.
#[test]
fn scenario_5_opcode_function_mismatch() {
    let err = assemble_instruction(
        Opcode::EXT_FUN_RET,
        &[AsmOperand::Func(FunctionCode::SetBInd.raw())],
    )
    .unwrap_err();
    assert_eq!(err, CompileError::WrongArity);

    // Inject the mismatched raw bytes directly, bypassing the assembler.
    let mut code = vec![0x35u8]; // EXT_FUN_RET
    code.extend_from_slice(&FunctionCode::SetBInd.raw().to_be_bytes());
    code.push(FIN_IMD);

    let mut state = MachineState::new(code, 8, 8, 8, 0);
    let host = NullHost {
        balance: 10_000,
        max_steps_per_round: 100,
        ..Default::default()
    };
    let limits = Limits::default();
    let outcome = run_round(&mut state, &host, &limits).unwrap();
    assert_eq!(outcome, RoundOutcome::Faulted);
    assert!(state.is_finished());
    assert!(state.had_fatal_error());
}

/// Scenario 6: a platform-specific function code the host declares with a
/// matching shape succeeds; the same `rawFunctionCode` executed under a
/// mismatched `EXT_FUN*` variant faults at run time, since the encoder has
/// no visibility into the host's own platform function-code table.
#[test]
fn scenario_6_platform_specific_function_code() {
    let mut code = Vec::new();
    code.push(0x01); // SET_VAL @0 = packed_timestamp(current_height, 0)
    code.extend_from_slice(&0i32.to_be_bytes());
    code.extend_from_slice(&u64::from(Timestamp::pack(5, 0)).to_be_bytes());
    code.push(0x32); // EXT_FUN_DAT 0x0501 @0
    code.extend_from_slice(&0x0501u16.to_be_bytes());
    code.extend_from_slice(&0i32.to_be_bytes());
    code.push(FIN_IMD);

    let mut state = MachineState::new(code, 8, 8, 8, 0);
    let host = NullHost {
        balance: 10_000,
        max_steps_per_round: 100,
        block_height: 5,
        ..Default::default()
    }
    .with_platform_code(0x0501, 1, false);
    let limits = Limits::default();
    run_to_completion(&mut state, &host, &limits);

    assert!(state.is_finished());
    assert!(!state.had_fatal_error());

    let mut bad_code = vec![0x37u8]; // EXT_FUN_RET_DAT_2: arity 2, returns a value
    bad_code.extend_from_slice(&0x0501u16.to_be_bytes());
    bad_code.extend_from_slice(&0i32.to_be_bytes());
    bad_code.extend_from_slice(&1i32.to_be_bytes());
    bad_code.push(FIN_IMD);
    let mut bad_state = MachineState::new(bad_code, 8, 8, 8, 0);
    let bad_host = NullHost {
        balance: 10_000,
        max_steps_per_round: 100,
        ..Default::default()
    }
    .with_platform_code(0x0501, 1, false);
    let outcome = run_round(&mut bad_state, &bad_host, &limits).unwrap();
    assert_eq!(outcome, RoundOutcome::Faulted);
    assert!(bad_state.had_fatal_error());
}
