use serde_json::{json, Value as Json};
use weft::prelude::*;

const MAX_ELEMENTS: u32 = 1 << 20;

fn document(builder: &ProgramBuilder) -> Json {
    let program = builder.finalize().expect("failed to finalize program");
    let json = program.to_json().expect("failed to serialize program");
    serde_json::from_str(&json).expect("emitted document is not valid JSON")
}

/// Grid-strided vector addition: `c[i] = a[i] + b[i]`.
fn vector_add() -> ProgramBuilder {
    let builder = ProgramBuilder::new();
    let mut ctx = builder.context();
    ctx.decl_variable("n", DataType::U32, IoType::Input).unwrap();

    let size = ctx.get("n").unwrap();
    ctx.decl_array("a", DataType::U32, IoType::Input, size, MAX_ELEMENTS)
        .unwrap();
    let size = ctx.get("n").unwrap();
    ctx.decl_array("b", DataType::U32, IoType::Input, size, MAX_ELEMENTS)
        .unwrap();
    let size = ctx.get("n").unwrap();
    ctx.decl_array("c", DataType::U32, IoType::Output, size, MAX_ELEMENTS)
        .unwrap();

    let wid = ctx.worker_id().unwrap();
    ctx.set("tid", wid).unwrap();
    let num = ctx.num_workers().unwrap();
    ctx.set("tsize", num).unwrap();

    ctx.while_(
        |c| {
            let tid = c.get("tid")?;
            let n = c.get("n")?;
            tid.lt(n)
        },
        |c| {
            let a = c.array("a")?;
            let b = c.array("b")?;
            let out = c.array("c")?;
            let lhs = a.load(c.get("tid")?)?;
            let rhs = b.load(c.get("tid")?)?;
            let sum = lhs.add(rhs)?;
            out.store(c.get("tid")?, sum)?;
            let next = c.get("tid")?.add(c.get("tsize")?)?;
            c.set("tid", next)
        },
    )
    .unwrap();

    builder
}

#[test]
fn empty_program_serializes_to_empty_directories() {
    let builder = ProgramBuilder::new();
    assert_eq!(
        document(&builder),
        json!({
            "symbol": {},
            "storage": {},
            "input": {},
            "output": {},
            "operation": [],
        })
    );
}

#[test]
fn scalar_add_document() {
    let builder = ProgramBuilder::new();
    let mut ctx = builder.context();
    ctx.decl_variable("n", DataType::U32, IoType::Input).unwrap();
    let n = ctx.get("n").unwrap();
    let sum = n.add(1).unwrap();
    ctx.set("x", sum).unwrap();

    let doc = document(&builder);
    assert_eq!(
        doc["operation"],
        json!([
            {"Load": [1, 0]},
            {"Constant": [2, {"U32": 1}]},
            {"Add": [3, 1, 2]},
            {"Store": [4, 3]},
        ])
    );
    assert_eq!(
        doc["symbol"],
        json!({
            "0": {"Variable": "U32"},
            "1": {"Constant": "U32"},
            "2": {"Constant": "U32"},
            "3": {"Constant": "U32"},
            "4": {"Variable": "U32"},
        })
    );
    assert_eq!(
        doc["storage"],
        json!({
            "0": {"Variable": "U32"},
            "4": {"Variable": "U32"},
        })
    );
    assert_eq!(doc["input"], json!({"n": 0}));
    assert_eq!(doc["output"], json!({}));
}

#[test]
fn vector_add_document() {
    let doc = document(&vector_add());

    assert_eq!(doc["input"], json!({"a": 2, "b": 4, "n": 0}));
    assert_eq!(doc["output"], json!({"c": 6}));
    assert_eq!(
        doc["storage"],
        json!({
            "0": {"Variable": "U32"},
            "2": {"SharedArray": ["U32", MAX_ELEMENTS]},
            "4": {"SharedArray": ["U32", MAX_ELEMENTS]},
            "6": {"SharedArray": ["U32", MAX_ELEMENTS]},
            "8": {"Variable": "U32"},
            "10": {"Variable": "U32"},
        })
    );

    assert_eq!(
        doc["operation"],
        json!([
            {"Load": [1, 0]},
            {"ArrayNew": [2, 1, "U32", MAX_ELEMENTS, true]},
            {"Load": [3, 0]},
            {"ArrayNew": [4, 3, "U32", MAX_ELEMENTS, true]},
            {"Load": [5, 0]},
            {"ArrayNew": [6, 5, "U32", MAX_ELEMENTS, true]},
            {"WorkerId": [7]},
            {"Store": [8, 7]},
            {"NumWorkers": [9]},
            {"Store": [10, 9]},
            {"While": [
                1,
                [{"Load": [11, 8]}, {"Load": [12, 0]}, {"Lt": [13, 11, 12]}],
                13,
                2,
                [
                    {"Load": [14, 8]},
                    {"ArrayLoad": [15, 2, 14]},
                    {"Load": [16, 8]},
                    {"ArrayLoad": [17, 4, 16]},
                    {"Add": [18, 15, 17]},
                    {"Load": [19, 8]},
                    {"ArrayStore": [6, 19, 18]},
                    {"Load": [20, 8]},
                    {"Load": [21, 10]},
                    {"Add": [22, 20, 21]},
                    {"Store": [8, 22]},
                ],
                3,
            ]},
        ])
    );
}

#[test]
fn identical_build_sequences_serialize_identically() {
    let first = vector_add().finalize().unwrap();
    let second = vector_add().finalize().unwrap();
    assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
}

#[test]
fn documents_round_trip_through_json() {
    let program = vector_add().finalize().unwrap();
    let json = program.to_json().unwrap();
    let parsed: Program = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, program);
}

#[test]
fn literal_payloads_are_tagged_by_type() {
    let builder = ProgramBuilder::new();
    let mut ctx = builder.context();
    ctx.set("i", -5).unwrap();
    ctx.set("u", 5u32).unwrap();
    ctx.set("f", 2.5f32).unwrap();
    ctx.set("b", true).unwrap();

    let doc = document(&builder);
    assert_eq!(doc["operation"][0], json!({"Constant": [0, {"I32": -5}]}));
    assert_eq!(doc["operation"][2], json!({"Constant": [2, {"U32": 5}]}));
    assert_eq!(doc["operation"][4], json!({"Constant": [4, {"F32": 2.5}]}));
    assert_eq!(doc["operation"][6], json!({"Constant": [6, {"Bool": true}]}));
}
