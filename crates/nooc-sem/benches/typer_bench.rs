use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nooc_sem::{infer_program, prelude_state};
use nooc_util::Handler;

fn sample_program() -> String {
    let mut src = String::new();
    src.push_str("compose = fn f g x => f (g x);\n");
    for i in 0..100 {
        src.push_str(&format!(
            "inc{i} = fn x => x + {i};\n\
             lst{i} = map inc{i} [1, 2, 3];\n\
             rec{i} = {{@id {i}, @name \"r{i}\"}};\n\
             get{i} = @name rec{i};\n"
        ));
    }
    src
}

fn bench_typecheck(c: &mut Criterion) {
    let source = sample_program();
    let handler = Handler::new();
    let program = nooc_par::Parser::parse_source(&source, &handler);
    assert!(!handler.has_errors());

    c.bench_function("typecheck_400_statements", |b| {
        b.iter(|| {
            let mut state = prelude_state().expect("prelude");
            let typed = infer_program(&mut state, black_box(&program)).expect("types");
            black_box(typed.len())
        })
    });
}

criterion_group!(benches, bench_typecheck);
criterion_main!(benches);
