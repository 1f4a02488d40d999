use deaduction::calculator::{Calculator, Symbol};
use deaduction::config::Config;
use deaduction::display::cursor::Side;
use deaduction::display::Displayer;
use deaduction::expr::Expr;
use deaduction::goal::{Goal, Tag};
use deaduction::node::NodeKind;
use deaduction::parse;
use deaduction::session::Session;

#[ctor::ctor]
fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn set(name: &str) -> Expr {
    Expr::local_constant(name, Some(Expr::universe()))
}

fn elem(name: &str, ty: &Expr) -> Expr {
    Expr::local_constant(name, Some(ty.clone()))
}

fn app(f: &Expr, x: &Expr) -> Expr {
    Expr::application(f, x).expect("well-typed application")
}

fn not(p: Expr) -> Expr {
    Expr::proposition(NodeKind::Not, vec![p])
}

#[test]
fn nested_quantifiers() {
    let (x_set, y_set) = (set("X"), set("Y"));
    let f = elem("f", &Expr::function_type(x_set.clone(), y_set.clone()));
    let x = Expr::bound_var("x", Some(x_set));
    let y = Expr::bound_var("y", Some(y_set));
    let eq = Expr::proposition(NodeKind::Equal, vec![app(&f, &x), y.clone()]);
    let exists = Expr::binder(NodeKind::Exists, &y, &eq, Some(Expr::prop()));
    let forall = Expr::binder(NodeKind::ForAll, &x, &exists, Some(Expr::prop()));

    let session = Session::default();
    insta::assert_snapshot!(Displayer::new(&session).display(&forall), @"∀x ∈ X, ∃y ∈ Y, f(x) = y");
}

#[test]
fn set_operations_keep_needed_parentheses() {
    let x_set = set("X");
    let subsets = Expr::set_of(x_set.clone());
    let (a, b, c) = (elem("A", &subsets), elem("B", &subsets), elem("C", &subsets));
    let union = Expr::new(
        NodeKind::Union,
        Default::default(),
        vec![b, c],
        Some(subsets.clone()),
    );
    let inter = Expr::new(NodeKind::Inter, Default::default(), vec![a, union], Some(subsets));
    let expr = Expr::proposition(NodeKind::Belongs, vec![elem("x", &x_set), inter]);

    let session = Session::default();
    insta::assert_snapshot!(Displayer::new(&session).display(&expr), @"x ∈ A ∩ (B ∪ C)");
}

#[test]
fn context_diff_tags() {
    let (x_set, y_set) = (set("X"), set("Y"));
    let f = || elem("f", &Expr::function_type(x_set.clone(), y_set.clone()));
    let target = elem("target", &Expr::proposition(NodeKind::True, vec![]));
    let old = Goal::new(vec![f(), elem("A", &Expr::set_of(x_set.clone()))], target.clone());
    let new = Goal::new(
        vec![f(), elem("A", &Expr::set_of(y_set.clone())), elem("x", &x_set)],
        target,
    );

    let diff = new.compare(&old);
    assert_eq!(diff.tags, vec![Tag::Unchanged, Tag::Modified, Tag::New]);
    assert_eq!(diff.context[2].display_name(), "x");
    assert_eq!(diff.target_tag, Tag::Unchanged);
    let tags: Vec<String> = diff.tags.iter().map(Tag::to_string).collect();
    insta::assert_snapshot!(tags.join(" "), @"= ≠ +");
}

#[test]
fn calculator_builds_a_sum() {
    let session = Session::default();
    let mut calc = Calculator::new();
    for symbol in [
        Symbol::Number("2".to_owned()),
        Symbol::Operator(NodeKind::Sum),
        Symbol::Number("3".to_owned()),
    ] {
        calc.insert(&session, &symbol).expect("symbol fits");
    }
    assert_eq!(calc.root().to_string(), "SUM(2, 3)");
    assert!(calc.is_complete());
    assert_eq!(calc.focus(), [1]);
    assert_eq!(calc.side(), Side::After);

    let (text, offset) = calc.render(&session);
    insta::assert_snapshot!(text, @"2 + 3‸");
    assert_eq!(offset, 5);
}

#[test]
fn negations_pushed_through_a_quantifier() {
    let x_set = set("X");
    let p = elem("P", &Expr::function_type(x_set.clone(), Expr::prop()));
    let x = Expr::bound_var("x", Some(x_set));
    let exists = Expr::binder(NodeKind::Exists, &x, &not(app(&p, &x)), Some(Expr::prop()));
    let expr = not(exists);

    let strict = Session::new(Config {
        allow_implicit_use_of_definitions: false,
        ..Default::default()
    });
    insta::assert_snapshot!(Displayer::new(&strict).display(&expr), @"¬(∃x ∈ X, ¬P(x))");
    let push = strict.push_negations(&expr);
    assert_eq!(push.simplifiable.len(), 1);
    assert_eq!(push.simplifiable[0].kind(), NodeKind::Exists);
    assert!(push.result.ptr_eq(&expr));

    let session = Session::default();
    let push = session.push_negations(&expr);
    assert_eq!(push.result.kind(), NodeKind::ForAll);
    insta::assert_snapshot!(Displayer::new(&session).display(&push.result), @"∀x ∈ X, P(x)");
}

#[test]
fn goal_read_from_prover_output() {
    let text = std::fs::read_to_string("tests/fixtures/goal.txt").expect("fixture exists");
    let (context, targets) = text.split_once("\n---\n").expect("separator");

    let mut session = Session::default();
    let goal = parse::parse_goal(&mut session, context, targets).expect("valid goal");
    session.name_goal(&goal).expect("names available");
    let displayer = Displayer::new(&session);
    let lines: Vec<String> = goal
        .context
        .iter()
        .map(|entry| displayer.context_entry(entry))
        .collect();
    insta::assert_snapshot!(lines.join("\n"), @r###"
    X: a set
    A: 𝒫(X)
    H: ∀x ∈ X, x ∈ A
    "###);
    let target = goal.target.math_type().expect("typed target");
    insta::assert_snapshot!(displayer.display(target), @"∃y ∈ X, y ∉ A");
}
