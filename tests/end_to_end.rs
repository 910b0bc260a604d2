use tms99105sim::flow::FlowState;
use tms99105sim::memory::Memory;
use tms99105sim::Simulation;

fn assemble_and_load(source: &str) -> Simulation {
    let out = Simulation::new().assemble(source);
    assert!(out.errors.is_empty(), "{:?}", out.errors);
    let mut sim = Simulation::new();
    sim.load_bytes(&out.image);
    sim
}

#[test]
fn load_immediate_sets_register_and_sign_flags() {
    let mut sim = assemble_and_load("    AORG >0100\n    LI   R1,>1234\n");
    sim.step_instruction();
    assert_eq!(sim.register(1), 0x1234);
    assert!(sim.status().l_gt());
    assert!(sim.status().a_gt());
    assert!(!sim.status().eq());
}

#[test]
fn add_sets_destination_and_clears_carry_and_overflow() {
    let source = concat!(
        "    AORG >0100\n",
        "    LI   R1,>0003\n",
        "    LI   R2,>0005\n",
        "    A    R1,R2\n",
    );
    let mut sim = assemble_and_load(source);
    sim.run(3);

    assert_eq!(sim.register(2), 0x0008);
    assert!(!sim.status().carry());
    assert!(!sim.status().overflow());
}

#[test]
fn jump_loop_counts_down_and_falls_through_after_jne() {
    let source = concat!(
        "    AORG >0100\n",
        "    LI   R0,0\n",
        "    LI   R1,3\n",
        "L1  INC  R0\n",
        "    DEC  R1\n",
        "    JNE  L1\n",
    );
    let mut sim = assemble_and_load(source);
    // 2 loads, then 3 trips round the loop body (the 3rd's JNE is the one not taken).
    sim.run(2 + 3 * 3);

    assert_eq!(sim.register(0), 3);
    assert!(sim.status().eq());
    // Two 4-byte LI's put L1 at 0x0108; the final (not-taken) JNE leaves PC
    // one loop body (INC, DEC, JNE) past it.
    assert_eq!(sim.pc(), 0x0108 + 2 * 3);
}

#[test]
fn lwpi_swaps_workspace_without_disturbing_the_old_one() {
    let source = concat!(
        "    AORG >0100\n",
        "    LI   R1,>002A\n",
        "    LWPI >00C0\n",
    );
    let mut sim = assemble_and_load(source);
    sim.step_instruction();
    assert_eq!(sim.wp(), 0x0080);
    assert_eq!(sim.register(1), 0x002A);

    sim.step_instruction();
    assert_eq!(sim.wp(), 0x00C0);

    // The word at the *old* workspace's R1 slot is untouched.
    let image = sim.memory_image();
    assert_eq!(image[0x0080 + 2], 0x00);
    assert_eq!(image[0x0080 + 3], 0x2A);
}

#[test]
fn movb_writes_only_the_high_byte_and_sets_parity() {
    let source = concat!(
        "    AORG >0100\n",
        "    LI   R1,>AB00\n",
        "    MOVB R1,@>0200\n",
    );
    let mut sim = assemble_and_load(source);
    sim.run(2);

    let image = sim.memory_image();
    assert_eq!(image[0x0200], 0xAB);
    assert_eq!(image[0x0201], 0x00);
    // 0xAB = 0b10101011 has 5 set bits: odd parity.
    assert!(sim.status().parity());
}

#[test]
fn bss_then_bes_bind_pre_and_post_advance_locations() {
    let out = Simulation::new().assemble("    AORG >0100\nBUF BSS  4\nEND2 BES 4\n");
    assert!(out.errors.is_empty(), "{:?}", out.errors);
    assert_eq!(out.symbols.get("BUF").unwrap().value, 0x0100);
    assert_eq!(out.symbols.get("END2").unwrap().value, 0x0108);
}

#[test]
fn clr_is_idempotent() {
    let mut sim = assemble_and_load(concat!("    AORG >0100\n", "    CLR  R0\n", "    CLR  R0\n",));
    sim.step_instruction();
    let status_after_first = sim.status();
    let r0_after_first = sim.register(0);

    sim.step_instruction();
    assert_eq!(sim.register(0), r0_after_first);
    assert_eq!(sim.status(), status_after_first);
}

#[test]
fn jump_target_matches_the_displacement_law() {
    let mut sim = assemble_and_load("    AORG >0100\n    JMP  $+12\n");
    let pc_before = sim.pc();
    sim.step_instruction();
    assert_eq!(sim.pc(), pc_before.wrapping_add(2).wrapping_add(2 * 5));
}

#[test]
fn memory_word_and_byte_accessors_agree() {
    let mut memory = Memory::new();
    memory.set_word(0x0300, 0xBEEF);
    assert_eq!(memory.get_byte(0x0300), 0xBE);
    assert_eq!(memory.get_byte(0x0301), 0xEF);
}

#[test]
fn assembler_and_hand_written_bytes_reach_the_same_state() {
    let source = "    AORG >0100\n    LI   R1,>1234\n";
    let mut by_assembler = assemble_and_load(source);
    by_assembler.step_instruction();

    let mut by_hand = Simulation::new();
    let mut image = vec![0u8; 0x0100];
    image.extend_from_slice(&[0x02, 0x01, 0x12, 0x34]); // LI R1,>1234
    by_hand.load_bytes(&image);
    by_hand.step_instruction();

    assert_eq!(by_assembler.register(1), by_hand.register(1));
    assert_eq!(by_assembler.pc(), by_hand.pc());
    assert_eq!(by_assembler.status(), by_hand.status());
}

#[test]
fn reset_reboots_to_the_default_vectors() {
    let mut sim = assemble_and_load("    AORG >0100\n    LI   R1,>0001\n");
    sim.step_instruction();
    sim.reset();
    assert_eq!(sim.pc(), 0x0100);
    assert_eq!(sim.wp(), 0x0080);
    assert_eq!(sim.flow_state(), FlowState::IntCheck);
    assert!(sim.status().privileged());
    assert!(!sim.status().eq());
}
