use cc32asm::{assemble_program, AsmError};

#[test]
fn word_data_program() {
    let report = assemble_program(include_str!("../programs/data.s")).unwrap();
    let expected = concat!(
        "\n\n#.data\n",
        "01 00 02 00 03 00 ",
        "\n\n#.data\n",
        "\n    Offset           Type          Value\n\n",
        "  SymbolNo     SymbolName   Section    Offset     Visibility\n\n",
        "         0      UNDEFINED         0         0              l\n",
        "         1          .data         1         0              l\n",
        "         2            lbl         1         0              l\n",
    );
    assert_eq!(report, expected);
}

#[test]
fn external_constant_load() {
    let report = assemble_program(include_str!("../programs/extern_load.s")).unwrap();
    let expected = concat!(
        "\n\n#.text\n",
        "EF 18 00 00 EF 10 00 00 \n",
        "\n\n#.text\n",
        "\n    Offset           Type          Value\n\n",
        "  00000003      R_16_high              2\n",
        "  00000007       R_16_low              2\n",
        "  SymbolNo     SymbolName   Section    Offset     Visibility\n\n",
        "         0      UNDEFINED         0         0              l\n",
        "         1          .text         1         0              l\n",
        "         2            ext         0         0              g\n",
        "         3          start         1         0              l\n",
    );
    assert_eq!(report, expected);
}

#[test]
fn pc_relative_branches() {
    let report = assemble_program(include_str!("../programs/branch.s")).unwrap();
    // addal, then a backwards call and load wrapping to 19/10 bits
    assert!(report.contains("\n\n#.text\nF1 0C 00 01 0C 87 FF F8 \nEA 80 87 F4 "));
}

#[test]
fn long_visibility_matrix() {
    let report = assemble_program(include_str!("../programs/longs.s")).unwrap();
    assert!(report.contains(concat!(
        "\n\n#.data\n",
        "01 00 02 00 02 00 00 00 \n",
        "FE FF FF FF 07 00 00 00 \n",
        "00 00 00 00 "
    )));
    // local + local relocates both sections at the same offset
    assert!(report.contains("  00000004           R_32              1\n  00000004           R_32              1\n"));
    // global - global relocates the ordinals, subtrahend negated
    assert!(report.contains("  00000010           R_32              2\n  00000010  R_32_negative              3\n"));
    assert!(report.contains("         6           vals         1         4              l\n"));
}

#[test]
fn section_declaration_shifts_label_ordinals() {
    let report = assemble_program(include_str!("../programs/sections.s")).unwrap();
    assert!(report.contains("\n\n#.text\nFE 08 02 00 "));
    assert!(report.contains("\n\n#.data\n05 00 "));
    // sections keep the contiguous ordinal block, labels follow
    assert!(report.contains("         1          .text         1         0              l\n"));
    assert!(report.contains("         2          .data         2         0              l\n"));
    assert!(report.contains("         3           main         1         0              l\n"));
    assert!(report.contains("         4              x         2         0              l\n"));
}

#[test]
fn char_align_and_skip_padding() {
    let report = assemble_program(include_str!("../programs/chars.s")).unwrap();
    assert!(report.contains("\n\n#.data\n48 69 00 00 00 00 00 "));
    assert!(report.contains("         3            buf         1         4              l\n"));
}

#[test]
fn calling_a_global_symbol_is_rejected() {
    let program = ".extern foo\n.text\nmoveq r1, #5\ncalleq foo\n.end\n";
    let err = assemble_program(program).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AsmError>(),
        Some(AsmError::CallRequiresLocalLabel(_))
    ));
    assert!(format!("{:#}", err).contains("pass two, line 4"));
}

#[test]
fn duplicate_labels_are_rejected() {
    let err = assemble_program("a:\na:\n.end\n").unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AsmError>(),
        Some(AsmError::DuplicateSymbol(_))
    ));
    assert!(format!("{:#}", err).contains("pass one, line 2"));
}

#[test]
fn unknown_directives_are_rejected() {
    let err = assemble_program(".data\n.wrod 1\n.end\n").unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AsmError>(),
        Some(AsmError::UnknownDirective(_))
    ));
}
