#![cfg(test)]
#![allow(clippy::panic_in_result_fn)]

use std::error::Error;
use unsparql::algebra::parse_and_lower;
use unsparql::{RenderConfig, RenderError, ShrinkConfig, render_query, shrink_query};

fn example_config() -> RenderConfig {
    let mut config = RenderConfig::default();
    config.prefixes.insert("ex", "http://example.org/");
    config
}

/// Rendering must be a fixed point: the text of the rendered query renders
/// to itself again.
fn assert_fixed_point(query: &str) -> Result<(), Box<dyn Error>> {
    let config = example_config();
    let once = render_query(query, &config)?;
    let twice = render_query(&once, &config)?;
    assert_eq!(once, twice, "second render diverged for {query}");
    Ok(())
}

/// The rendered text must lower to the same algebra as the input. Generated
/// variable names are minted in traversal order on both sides, so a faithful
/// rendering makes the trees equal outright.
fn assert_same_algebra(query: &str) -> Result<(), Box<dyn Error>> {
    let rendered = render_query(query, &example_config())?;
    assert_eq!(
        parse_and_lower(query)?,
        parse_and_lower(&rendered)?,
        "algebra changed for {query}"
    );
    Ok(())
}

const PATH_QUERIES: &[&str] = &[
    "PREFIX ex: <http://example.org/> SELECT ?s ?o WHERE { ?s ex:a/ex:b ?o }",
    "PREFIX ex: <http://example.org/> SELECT ?s ?o WHERE { ?s ex:a/ex:b/ex:c ?o }",
    "PREFIX ex: <http://example.org/> SELECT ?s ?o WHERE { ?s ex:a|ex:b ?o }",
    "PREFIX ex: <http://example.org/> SELECT ?s ?o WHERE { ?s ^ex:a ?o }",
    "PREFIX ex: <http://example.org/> SELECT ?s ?o WHERE { ?s ex:a* ?o }",
    "PREFIX ex: <http://example.org/> SELECT ?s ?o WHERE { ?s ex:a+ ?o }",
    "PREFIX ex: <http://example.org/> SELECT ?s ?o WHERE { ?s ex:a? ?o }",
    "PREFIX ex: <http://example.org/> SELECT ?s ?o WHERE { ?s (ex:a/ex:b)+ ?o }",
    "PREFIX ex: <http://example.org/> SELECT ?s ?o WHERE { ?s !ex:p ?o }",
    "PREFIX ex: <http://example.org/> SELECT ?s ?o WHERE { ?s !(ex:pA|ex:pB) ?o }",
    "PREFIX ex: <http://example.org/> SELECT ?s ?o WHERE { ?s !(ex:pA|^ex:pB) ?o }",
];

#[test]
fn path_queries_render_to_a_fixed_point() -> Result<(), Box<dyn Error>> {
    for query in PATH_QUERIES {
        assert_fixed_point(query)?;
    }
    Ok(())
}

#[test]
fn path_queries_round_trip_through_the_lowered_algebra() -> Result<(), Box<dyn Error>> {
    for query in PATH_QUERIES {
        assert_same_algebra(query)?;
    }
    Ok(())
}

#[test]
fn reversed_sequence_renders_in_forward_direction() -> Result<(), Box<dyn Error>> {
    // `^(a/b)` is rendered as the equivalent forward sequence from the other
    // endpoint. The re-lowered tree differs only in generated variable
    // spelling, so this one is checked as a fixed point instead of by
    // algebra equality.
    let query =
        "PREFIX ex: <http://example.org/> SELECT ?s ?o WHERE { ?s ^(ex:a/ex:b) ?o }";
    let rendered = render_query(query, &example_config())?;
    assert!(rendered.contains("?o ex:a/ex:b ?s ."));
    assert_fixed_point(query)
}

#[test]
fn modifier_queries_round_trip() -> Result<(), Box<dyn Error>> {
    for query in [
        "PREFIX ex: <http://example.org/> SELECT DISTINCT ?s WHERE { ?s ex:p ?o } ORDER BY ?s LIMIT 10 OFFSET 5",
        "PREFIX ex: <http://example.org/> SELECT ?s (COUNT(?o) AS ?n) WHERE { ?s ex:p ?o } GROUP BY ?s HAVING(COUNT(?o) > 2)",
        "PREFIX ex: <http://example.org/> SELECT ?s ?label WHERE { ?s ex:p ?o BIND(STR(?s) AS ?label) }",
        "PREFIX ex: <http://example.org/> SELECT ?s WHERE { ?s ex:p ?o . { SELECT ?o WHERE { ?o ex:q ?z } LIMIT 3 } }",
    ] {
        assert_fixed_point(query)?;
        assert_same_algebra(query)?;
    }
    Ok(())
}

#[test]
fn bind_order_survives_projection_reordering() -> Result<(), Box<dyn Error>> {
    // The BINDs are written in the opposite order of the projection, so the
    // Extend chain only survives if the assignments stay in the group body.
    let query = "PREFIX ex: <http://example.org/> SELECT ?b ?a WHERE { ?s ex:p ?o BIND(1 AS ?a) BIND(2 AS ?b) }";
    assert_fixed_point(query)?;
    assert_same_algebra(query)
}

#[test]
fn debug_dump_shows_both_ir_stages() -> Result<(), Box<dyn Error>> {
    let mut config = example_config();
    config.debug_ir = true;
    let text = render_query(
        "PREFIX ex: <http://example.org/> SELECT ?s ?o WHERE { ?s ex:a/ex:b ?o }",
        &config,
    )?;
    assert!(text.contains("# IR (raw)"));
    assert!(text.contains("# IR (transformed)"));
    Ok(())
}

#[test]
fn group_shapes_round_trip() -> Result<(), Box<dyn Error>> {
    for query in [
        "PREFIX ex: <http://example.org/> SELECT ?s WHERE { GRAPH ?g { ?s ex:p ?o } }",
        "PREFIX ex: <http://example.org/> SELECT ?s WHERE { SERVICE SILENT <http://example.org/sparql> { ?s ex:p ?o } }",
        "PREFIX ex: <http://example.org/> SELECT ?s WHERE { ?s ex:p ?o MINUS { ?s ex:q ?o } }",
        "PREFIX ex: <http://example.org/> SELECT ?s ?o WHERE { VALUES (?s ?o) { (ex:a \"1\") (UNDEF \"2\") } ?s ex:p ?o }",
        "PREFIX ex: <http://example.org/> SELECT ?s WHERE { ?s ex:p ?o OPTIONAL { ?o ex:q ?z FILTER(?z > 1) } }",
    ] {
        assert_fixed_point(query)?;
        assert_same_algebra(query)?;
    }
    Ok(())
}

#[test]
fn redundant_group_braces_are_normalized_away() -> Result<(), Box<dyn Error>> {
    let config = example_config();
    let nested = render_query(
        "PREFIX ex: <http://example.org/> SELECT ?s WHERE { { { ?s ex:p ?o } } }",
        &config,
    )?;
    let flat = render_query(
        "PREFIX ex: <http://example.org/> SELECT ?s WHERE { ?s ex:p ?o }",
        &config,
    )?;
    assert_eq!(nested, flat);
    Ok(())
}

#[test]
fn user_unions_keep_their_scope() -> Result<(), Box<dyn Error>> {
    // A union the user wrote stays a union even when both branches are
    // single steps that a path alternative could express.
    let rendered = render_query(
        "PREFIX ex: <http://example.org/> SELECT ?s ?o WHERE { { ?s ex:a ?o } UNION { ?s ex:b ?o } }",
        &example_config(),
    )?;
    assert_eq!(rendered.matches("UNION").count(), 1);
    assert!(!rendered.contains("ex:a|ex:b"));

    // The union synthesized for an alternative path folds back instead.
    let rendered = render_query(
        "PREFIX ex: <http://example.org/> SELECT ?s ?o WHERE { ?s ex:a|ex:b ?o }",
        &example_config(),
    )?;
    assert!(!rendered.contains("UNION"));
    assert!(rendered.contains("ex:a|ex:b"));
    Ok(())
}

#[test]
fn left_nested_unions_keep_their_branch_count() -> Result<(), Box<dyn Error>> {
    let query = "PREFIX ex: <http://example.org/> SELECT ?s ?o WHERE { { ?s ex:a ?o } UNION { ?s ex:b ?o } UNION { ?s ex:c ?o } }";
    let rendered = render_query(query, &example_config())?;
    assert_eq!(rendered.matches("UNION").count(), 2);
    assert_fixed_point(query)
}

#[test]
fn user_variable_spelled_like_a_bridge_aborts_fusion() {
    let err = render_query(
        "PREFIX ex: <http://example.org/> SELECT ?s WHERE { ?s ex:a/ex:b ?o . FILTER(BOUND(?_anon_path_0)) }",
        &example_config(),
    )
    .unwrap_err();
    assert!(matches!(err, RenderError::FusionSafetyViolation(_)));
}

#[test]
fn user_written_bridge_chain_aborts_instead_of_fusing() {
    let err = render_query(
        "PREFIX ex: <http://example.org/> SELECT ?s ?o WHERE { ?s ex:a ?_anon_path_user . ?_anon_path_user ex:b ?o }",
        &example_config(),
    )
    .unwrap_err();
    assert!(matches!(err, RenderError::FusionSafetyViolation(_)));
}

#[test]
fn values_row_order_follows_the_config() -> Result<(), Box<dyn Error>> {
    let query = "SELECT ?x WHERE { VALUES ?x { \"b\" \"a\" \"c\" } }";
    let preserved = render_query(query, &RenderConfig::default())?;
    assert!(preserved.contains("{ \"b\" \"a\" \"c\" }"));

    let mut config = RenderConfig::default();
    config.values_preserve_order = false;
    let sorted = render_query(query, &config)?;
    assert!(sorted.contains("{ \"a\" \"b\" \"c\" }"));
    Ok(())
}

#[test]
fn exists_bodies_get_their_paths_back() -> Result<(), Box<dyn Error>> {
    let query = "PREFIX ex: <http://example.org/> SELECT ?s WHERE { ?s ex:a ?o FILTER NOT EXISTS { ?o ex:b/ex:c ?z } }";
    let rendered = render_query(query, &example_config())?;
    assert!(rendered.contains("FILTER NOT EXISTS {"));
    assert!(rendered.contains("ex:b/ex:c"));
    assert_fixed_point(query)
}

#[test]
fn scenario_query_renders_stably() -> Result<(), Box<dyn Error>> {
    let query = "\
        PREFIX ex: <http://example.org/> \
        SELECT DISTINCT ?person ?name WHERE { \
          ?person ex:knows+/ex:name ?name . \
          { ?person ex:worksFor ?org } UNION { ?org ex:employs ?person } \
          OPTIONAL { ?person ^ex:manages ?boss } \
          FILTER(?name != \"\") \
        } ORDER BY ?name LIMIT 20";
    insta::assert_snapshot!(render_query(query, &example_config())?, @r#"
    PREFIX ex: <http://example.org/>
    SELECT DISTINCT ?person ?name WHERE {
      ?person ex:knows+/ex:name ?name .
      {
        ?person ex:worksFor ?org .
      } UNION {
        ?org ex:employs ?person .
      }
      OPTIONAL {
        ?person ^ex:manages ?boss .
      }
      FILTER(?name != "")
    }
    ORDER BY ?name
    LIMIT 20
    "#);
    assert_fixed_point(query)
}

#[test]
fn shrinker_keeps_only_what_the_oracle_needs() -> Result<(), Box<dyn Error>> {
    let query = "\
        PREFIX ex: <http://example.org/> \
        SELECT ?s ?o WHERE { \
          ?s ex:a/ex:b ?o . \
          ?s ex:noise ?n \
          OPTIONAL { ?n ex:more ?m } \
        }";
    let oracle = |candidate: &str| {
        render_query(candidate, &RenderConfig::default()).is_ok_and(|text| {
            text.contains("<http://example.org/a>/<http://example.org/b>")
        })
    };
    let shrunk = shrink_query(query, oracle, &ShrinkConfig::default())?;
    assert!(shrunk.contains("http://example.org/a"));
    assert!(shrunk.contains("http://example.org/b"));
    assert!(!shrunk.contains("noise"));
    assert!(!shrunk.contains("OPTIONAL"));
    Ok(())
}
