use criterion::{Criterion, black_box, criterion_group, criterion_main};
use reckon_calculator::{
    CompiledFormula, ExpressionLimits, FormulaSpec, FormulaStore, FunctionRegistry, InputField,
    InputKind, Inputs, OutputKind, Value, parse_program,
};

const AMORTIZATION: &str = "
    let ppy = cond when frequency == \"monthly\" then 12
        when frequency == \"biweekly\" then 26
        when frequency == \"weekly\" then 52
        default 1;
    let n = loanTerm * ppy;
    let r = interestRate / 100 / ppy;
    payment = if r == 0 then principal / n else principal * r * (1 + r) ** n / ((1 + r) ** n - 1);
    totalInterest = payment * n - principal
";

fn loan_spec() -> FormulaSpec {
    FormulaSpec {
        name: "primary".to_string(),
        input_schema: [
            ("principal".to_string(), InputField::new(InputKind::Number).with_range(Some(1.0), None)),
            ("interestRate".to_string(), InputField::new(InputKind::Number).with_range(Some(0.0), Some(100.0))),
            ("loanTerm".to_string(), InputField::new(InputKind::Integer).with_range(Some(1.0), Some(40.0))),
            (
                "frequency".to_string(),
                InputField::new(InputKind::Text).with_choices(&["monthly", "biweekly", "weekly"]),
            ),
        ]
        .into(),
        expression: AMORTIZATION.to_string(),
        output_schema: [
            ("payment".to_string(), OutputKind::Currency),
            ("totalInterest".to_string(), OutputKind::Currency),
        ]
        .into(),
    }
}

fn parse_benchmark(c: &mut Criterion) {
    c.bench_function("parse_amortization", |b| b.iter(|| parse_program(black_box(AMORTIZATION))));
}

fn compile_benchmark(c: &mut Criterion) {
    let functions = FunctionRegistry::with_builtins();
    let limits = ExpressionLimits::default();
    c.bench_function("compile_loan_formula", |b| {
        b.iter(|| CompiledFormula::compile(black_box(loan_spec()), &functions, &limits))
    });
}

fn evaluate_benchmark(c: &mut Criterion) {
    let mut store = FormulaStore::default();
    store.register_formula("loan", loan_spec()).unwrap();

    let inputs = Inputs::from([
        ("principal".to_string(), Value::Number(250_000.0)),
        ("interestRate".to_string(), Value::Number(5.25)),
        ("loanTerm".to_string(), Value::Number(30.0)),
        ("frequency".to_string(), Value::from("biweekly")),
    ]);

    c.bench_function("evaluate_loan_formula", |b| {
        b.iter(|| store.evaluate("loan", "primary", black_box(&inputs)))
    });
}

criterion_group!(benches, parse_benchmark, compile_benchmark, evaluate_benchmark);
criterion_main!(benches);
