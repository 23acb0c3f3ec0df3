use formula_expr::{parse, resolve_reference_fields, resolve_reference_fields_not_local};
use pretty_assertions::assert_eq;

fn fields(text: &str) -> Vec<String> {
    resolve_reference_fields(&parse(text)).expect("reference extraction")
}

#[test]
fn identifiers_selectors_and_call_arguments() {
    assert_eq!(
        fields("person.name + person.age + lala + run(a, b, c, d)"),
        vec!["person.name", "person.age", "lala", "a", "b", "c", "d"]
    );
}

#[test]
fn every_reference_in_the_tree_is_listed() {
    assert_eq!(
        fields("cond ? items.first : -(fallback ?? [alt, 'x'])"),
        vec!["cond", "items.first", "fallback", "alt"]
    );
}

#[test]
fn callee_names_are_not_data_references() {
    assert_eq!(fields("join(mapToArr(value, 'name'), ',')"), vec!["value"]);
    assert_eq!(fields("now()"), Vec::<String>::new());
}

#[test]
fn duplicates_collapse() {
    assert_eq!(fields("x + x * x.y + x.y"), vec!["x", "x.y"]);
}

#[test]
fn locals_are_filtered_by_the_not_local_variant() {
    let source = parse("$total = price * count, $total + tax");
    assert_eq!(
        resolve_reference_fields(&source).unwrap(),
        vec!["$total", "price", "count", "tax"]
    );
    assert_eq!(
        resolve_reference_fields_not_local(&source).unwrap(),
        vec!["price", "count", "tax"]
    );
}

#[test]
fn deep_dotted_paths_join_with_dots() {
    assert_eq!(fields("a.b.c.d == null"), vec!["a.b.c.d"]);
}
