use weft::prelude::*;

#[test]
fn an_unused_input_still_lands_in_the_directories() {
    let builder = ProgramBuilder::new();
    let mut ctx = builder.context();
    ctx.decl_variable("n", DataType::U32, IoType::Input).unwrap();

    let program = builder.finalize().unwrap();
    assert!(program.operations().is_empty());
    assert_eq!(program.inputs()["n"], 0);
    assert_eq!(program.symbols()[&0], Symbol::Variable(DataType::U32));
    assert_eq!(program.storage()[&0], StorageEntry::Variable(DataType::U32));
}

#[test]
fn output_declarations_bind_the_output_directory() {
    let builder = ProgramBuilder::new();
    let mut ctx = builder.context();
    ctx.decl_variable("result", DataType::F32, IoType::Output)
        .unwrap();

    let program = builder.finalize().unwrap();
    assert!(program.inputs().is_empty());
    assert_eq!(program.outputs()["result"], 0);
}

#[test]
fn private_declarations_stay_out_of_the_io_directories() {
    let builder = ProgramBuilder::new();
    let mut ctx = builder.context();
    ctx.decl_variable("tmp", DataType::I32, IoType::Private).unwrap();

    let program = builder.finalize().unwrap();
    assert!(program.inputs().is_empty());
    assert!(program.outputs().is_empty());
    assert_eq!(program.storage()[&0], StorageEntry::Variable(DataType::I32));
}

#[test]
fn implicit_stores_pick_the_literal_type() {
    let builder = ProgramBuilder::new();
    let mut ctx = builder.context();
    ctx.set("x", -5).unwrap();
    ctx.set("y", 5u32).unwrap();

    let program = builder.finalize().unwrap();
    assert_eq!(program.symbols()[&0], Symbol::Constant(DataType::I32));
    assert_eq!(program.symbols()[&1], Symbol::Variable(DataType::I32));
    assert_eq!(program.symbols()[&2], Symbol::Constant(DataType::U32));
    assert_eq!(program.symbols()[&3], Symbol::Variable(DataType::U32));
    assert_eq!(program.storage()[&1], StorageEntry::Variable(DataType::I32));
    assert_eq!(program.storage()[&3], StorageEntry::Variable(DataType::U32));
    assert_eq!(
        program.operations(),
        &[
            Op::Constant(0, Literal::I32(-5)),
            Op::Store(1, 0),
            Op::Constant(2, Literal::U32(5)),
            Op::Store(3, 2),
        ]
    );
}

#[test]
fn stores_to_a_declared_variable_are_type_checked() {
    let builder = ProgramBuilder::new();
    let mut ctx = builder.context();
    ctx.decl_variable("x", DataType::U32, IoType::Private).unwrap();
    assert_eq!(
        ctx.set("x", 1.5f32),
        Err(BuilderError::TypeMismatch {
            expected: DataType::U32,
            found: DataType::F32
        })
    );
    ctx.set("x", 7u32).unwrap();
}

#[test]
fn names_cannot_be_declared_twice() {
    let builder = ProgramBuilder::new();
    let mut ctx = builder.context();
    ctx.decl_variable("x", DataType::U32, IoType::Private).unwrap();
    assert_eq!(
        ctx.decl_variable("x", DataType::U32, IoType::Private),
        Err(BuilderError::NameConflict("x".to_string()))
    );

    ctx.set("y", 1u32).unwrap();
    assert_eq!(
        ctx.decl_variable("y", DataType::U32, IoType::Private),
        Err(BuilderError::NameConflict("y".to_string()))
    );
}

#[test]
fn io_names_are_unique_across_contexts() {
    let builder = ProgramBuilder::new();
    let mut first = builder.context();
    let mut second = builder.context();
    first.decl_variable("n", DataType::U32, IoType::Input).unwrap();
    assert_eq!(
        second.decl_variable("n", DataType::U32, IoType::Output),
        Err(BuilderError::NameConflict("n".to_string()))
    );

    // Private names are per-context and never collide program-wide.
    second.decl_variable("n", DataType::U32, IoType::Private).unwrap();
}

#[test]
fn reads_of_undeclared_or_mismatched_names_fail() {
    let builder = ProgramBuilder::new();
    let mut ctx = builder.context();
    assert_eq!(
        ctx.get("missing").unwrap_err(),
        BuilderError::UnknownName("missing".to_string())
    );
    assert_eq!(
        ctx.array("missing").unwrap_err(),
        BuilderError::UnknownName("missing".to_string())
    );

    ctx.decl_array("buf", DataType::U32, IoType::Private, 4u32, 4)
        .unwrap();
    ctx.set("x", 1u32).unwrap();
    assert_eq!(
        ctx.get("buf").unwrap_err(),
        BuilderError::NotAVariable("buf".to_string())
    );
    assert_eq!(
        ctx.set("buf", 1u32),
        Err(BuilderError::NotAVariable("buf".to_string()))
    );
    assert_eq!(
        ctx.array("x").unwrap_err(),
        BuilderError::NotAnArray("x".to_string())
    );
}

#[test]
fn private_arrays_record_an_unshared_array_new() {
    let builder = ProgramBuilder::new();
    let mut ctx = builder.context();
    ctx.decl_array("buf", DataType::F32, IoType::Private, 16u32, 32)
        .unwrap();

    let program = builder.finalize().unwrap();
    assert_eq!(
        program.operations(),
        &[
            Op::Constant(0, Literal::U32(16)),
            Op::ArrayNew(1, 0, DataType::F32, 32, false),
        ]
    );
    assert_eq!(program.symbols()[&1], Symbol::Array(DataType::F32));
    assert_eq!(
        program.storage()[&1],
        StorageEntry::PrivateArray(DataType::F32, 32)
    );
    assert!(program.inputs().is_empty());
    assert!(program.outputs().is_empty());
}

#[test]
fn array_sizes_must_be_u32() {
    let builder = ProgramBuilder::new();
    let mut ctx = builder.context();
    assert_eq!(
        ctx.decl_array("buf", DataType::U32, IoType::Private, -1, 4),
        Err(BuilderError::InvalidType {
            op: "ArrayNew",
            found: DataType::I32
        })
    );
}

#[test]
fn array_accesses_check_index_and_element_types() {
    let builder = ProgramBuilder::new();
    let mut ctx = builder.context();
    ctx.decl_array("buf", DataType::U32, IoType::Private, 8u32, 8)
        .unwrap();
    let buf = ctx.array("buf").unwrap();

    let element = buf.load(3u32).unwrap();
    assert_eq!(element.data_type(), DataType::U32);
    buf.store(4u32, element).unwrap();

    assert_eq!(
        buf.load(0.5f32).unwrap_err(),
        BuilderError::InvalidType {
            op: "ArrayLoad",
            found: DataType::F32
        }
    );
    assert_eq!(
        buf.store(0u32, 0.5f32),
        Err(BuilderError::TypeMismatch {
            expected: DataType::U32,
            found: DataType::F32
        })
    );

    let length = buf.len().unwrap();
    assert_eq!(length.data_type(), DataType::U32);

    let program = builder.finalize().unwrap();
    let tags: Vec<_> = program
        .operations()
        .iter()
        .map(|op| match op {
            Op::Constant(..) => "Constant",
            Op::ArrayNew(..) => "ArrayNew",
            Op::ArrayLoad(..) => "ArrayLoad",
            Op::ArrayStore(..) => "ArrayStore",
            Op::ArrayLen(..) => "ArrayLen",
            other => panic!("unexpected record {other:?}"),
        })
        .collect();
    assert_eq!(
        tags,
        [
            "Constant",   // array size
            "ArrayNew",
            "Constant",   // load index
            "ArrayLoad",
            "Constant",   // store index
            "ArrayStore",
            "Constant",   // rejected float index
            "Constant",   // rejected store index
            "Constant",   // rejected float element
            "ArrayLen",
        ]
    );
}

#[test]
fn stores_from_another_program_are_rejected() {
    let other = ProgramBuilder::new();
    let foreign = other.context().uint32(1).unwrap();

    let builder = ProgramBuilder::new();
    let mut ctx = builder.context();
    assert_eq!(
        ctx.set("x", foreign),
        Err(BuilderError::CrossProgramOperand)
    );
}
