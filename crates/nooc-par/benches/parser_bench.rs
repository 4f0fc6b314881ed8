use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nooc_par::Parser;
use nooc_util::Handler;

fn sample_program() -> String {
    let mut src = String::new();
    src.push_str("constraint Show a ( show : a -> String );\n");
    src.push_str("type Shape = Circle Float | Square Float;\n");
    for i in 0..200 {
        src.push_str(&format!(
            "f{i} = fn x => match x with (Circle r => r * r; Square s => s);\n\
             v{i} = f{i} (Circle {i});\n"
        ));
    }
    src
}

fn bench_parse(c: &mut Criterion) {
    let source = sample_program();
    c.bench_function("parse_400_statements", |b| {
        b.iter(|| {
            let handler = Handler::new();
            let program = Parser::parse_source(black_box(&source), &handler);
            black_box(program.len())
        })
    });
}

criterion_group!(benches, bench_parse);
criterion_main!(benches);
