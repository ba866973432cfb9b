use crate::{IrBgp, IrNode, IrSelect, IrSelectExpr, RenderError};
use itertools::Itertools;
use spargebra::algebra::Expression;
use spargebra::term::GroundTerm;
use std::fmt::Write;
use unsparql_model::{
    PathStyle, PatternTerm, PredicatePattern, PrefixMap, TrackedVar, VarOrigin,
    write_ground_term, write_predicate_iri,
};

/// Options controlling the emitted SPARQL text.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Namespace prefixes. Every entry is declared in the output, and IRIs
    /// under a declared namespace are written in compact form.
    pub prefixes: PrefixMap,
    /// When `false`, VALUES rows are emitted in lexicographic order of
    /// their rendered form instead of binding order.
    pub values_preserve_order: bool,
    /// Emit the intermediate trees, before and after path reconstruction,
    /// as comment lines before the query.
    pub debug_ir: bool,
    pub path_style: PathStyle,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            prefixes: PrefixMap::new(),
            values_preserve_order: true,
            debug_ir: false,
            path_style: PathStyle::default(),
        }
    }
}

/// Renders a reconstructed query as SPARQL text.
///
/// The input must have gone through [crate::transform::reconstruct] first:
/// any leftover desugaring artifact (a generated variable, a direction
/// marker, a zero-length or arbitrary-length operator) has no surface form
/// and aborts with [RenderError::RenderInvariantViolation].
pub fn render(select: &IrSelect, config: &RenderConfig) -> Result<String, RenderError> {
    render_traced(select, None, config)
}

/// Like [render], with the pre-reconstruction tree available for the
/// `debug_ir` dump. When [RenderConfig::debug_ir] is set, `raw` is emitted
/// as an `IR (raw)` comment block ahead of the `IR (transformed)` one.
pub fn render_traced(
    select: &IrSelect,
    raw: Option<&IrSelect>,
    config: &RenderConfig,
) -> Result<String, RenderError> {
    let mut renderer = Renderer::new(config);
    renderer.render_query(select, raw)?;
    Ok(renderer.finish())
}

pub(crate) struct Renderer<'a> {
    pub(crate) config: &'a RenderConfig,
    pub(crate) out: String,
    pub(crate) indent: usize,
}

impl<'a> Renderer<'a> {
    fn new(config: &'a RenderConfig) -> Self {
        Self {
            config,
            out: String::new(),
            indent: 0,
        }
    }

    fn finish(self) -> String {
        self.out
    }

    fn start_line(&mut self) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
    }

    fn end_line(&mut self) {
        self.out.push('\n');
    }

    fn render_query(
        &mut self,
        select: &IrSelect,
        raw: Option<&IrSelect>,
    ) -> Result<(), RenderError> {
        for (prefix, namespace) in self.config.prefixes.iter() {
            let _ = writeln!(self.out, "PREFIX {prefix}: <{namespace}>");
        }
        if self.config.debug_ir {
            if let Some(raw) = raw {
                self.dump_comments("IR (raw)", raw);
            }
            self.dump_comments("IR (transformed)", select);
        }
        self.render_select(select)
    }

    fn dump_comments(&mut self, label: &str, select: &IrSelect) {
        let _ = writeln!(self.out, "# {label}");
        for line in select.dump().lines() {
            let _ = writeln!(self.out, "# {line}");
        }
    }

    fn render_select(&mut self, select: &IrSelect) -> Result<(), RenderError> {
        self.start_line();
        self.out.push_str("SELECT ");
        if select.distinct {
            self.out.push_str("DISTINCT ");
        }
        if select.reduced {
            self.out.push_str("REDUCED ");
        }
        if select.projection.is_empty() {
            self.out.push('*');
        } else {
            for (i, item) in select.projection.iter().enumerate() {
                if i > 0 {
                    self.out.push(' ');
                }
                match &item.expression {
                    None => self.write_variable(&item.variable)?,
                    Some(IrSelectExpr::Expr(expr)) => {
                        self.out.push('(');
                        self.write_expression(expr, &select.aggregates)?;
                        self.out.push_str(" AS ");
                        self.write_variable(&item.variable)?;
                        self.out.push(')');
                    }
                    Some(IrSelectExpr::Aggregate(agg)) => {
                        self.out.push('(');
                        self.write_aggregate(agg)?;
                        self.out.push_str(" AS ");
                        self.write_variable(&item.variable)?;
                        self.out.push(')');
                    }
                }
            }
        }
        self.out.push_str(" WHERE {");
        self.end_line();
        self.indent += 1;
        self.render_bgp(&select.where_clause)?;
        self.indent -= 1;
        self.start_line();
        self.out.push('}');
        self.end_line();

        if !select.group_by.is_empty() {
            self.start_line();
            self.out.push_str("GROUP BY");
            for var in &select.group_by {
                self.out.push(' ');
                self.write_variable(var)?;
            }
            self.end_line();
        }
        for condition in &select.having {
            self.start_line();
            self.out.push_str("HAVING(");
            self.write_expression(condition, &select.aggregates)?;
            self.out.push(')');
            self.end_line();
        }
        if !select.order_by.is_empty() {
            self.start_line();
            self.out.push_str("ORDER BY");
            for spec in &select.order_by {
                self.out.push(' ');
                let plain = spec.ascending
                    && matches!(&spec.expression, Expression::Variable(v)
                        if select.aggregate_for(v.as_str()).is_none());
                if plain {
                    self.write_expression(&spec.expression, &select.aggregates)?;
                } else {
                    self.out
                        .push_str(if spec.ascending { "ASC(" } else { "DESC(" });
                    self.write_expression(&spec.expression, &select.aggregates)?;
                    self.out.push(')');
                }
            }
            self.end_line();
        }
        if let Some(limit) = select.limit {
            self.start_line();
            let _ = write!(self.out, "LIMIT {limit}");
            self.end_line();
        }
        if let Some(offset) = select.offset {
            self.start_line();
            let _ = write!(self.out, "OFFSET {offset}");
            self.end_line();
        }
        Ok(())
    }

    pub(crate) fn render_bgp(&mut self, bgp: &IrBgp) -> Result<(), RenderError> {
        for line in &bgp.lines {
            self.render_line(line)?;
        }
        Ok(())
    }

    fn render_line(&mut self, line: &IrNode) -> Result<(), RenderError> {
        match line {
            IrNode::StatementPattern { inverted: true, .. } => {
                Err(RenderError::RenderInvariantViolation(
                    "direction-marked pattern survived path reconstruction".to_owned(),
                ))
            }
            IrNode::StatementPattern {
                subject,
                predicate,
                object,
                inverted: false,
            } => {
                self.start_line();
                self.write_pattern_term(subject)?;
                self.out.push(' ');
                match predicate {
                    PredicatePattern::NamedNode(iri) => write_predicate_iri(
                        &mut self.out,
                        iri.as_ref(),
                        &self.config.prefixes,
                    ),
                    PredicatePattern::Variable(var) => self.write_variable(var)?,
                }
                self.out.push(' ');
                self.write_pattern_term(object)?;
                self.out.push_str(" .");
                self.end_line();
                Ok(())
            }
            IrNode::PathTriple {
                subject,
                path,
                object,
            } => {
                self.start_line();
                self.write_pattern_term(subject)?;
                self.out.push(' ');
                path.write_sparql(
                    &mut self.out,
                    &self.config.prefixes,
                    self.config.path_style,
                );
                self.out.push(' ');
                self.write_pattern_term(object)?;
                self.out.push_str(" .");
                self.end_line();
                Ok(())
            }
            IrNode::ZeroLengthPath { .. } => Err(RenderError::RenderInvariantViolation(
                "zero-length path survived path reconstruction".to_owned(),
            )),
            IrNode::ArbitraryLengthPath { .. } => {
                Err(RenderError::RenderInvariantViolation(
                    "arbitrary-length path survived path reconstruction".to_owned(),
                ))
            }
            IrNode::Graph { name, inner } => {
                self.start_line();
                self.out.push_str("GRAPH ");
                self.write_name(name)?;
                self.out.push_str(" {");
                self.end_line();
                self.render_block(inner)?;
                Ok(())
            }
            IrNode::Service {
                name,
                inner,
                silent,
            } => {
                self.start_line();
                self.out.push_str(if *silent {
                    "SERVICE SILENT "
                } else {
                    "SERVICE "
                });
                self.write_name(name)?;
                self.out.push_str(" {");
                self.end_line();
                self.render_block(inner)?;
                Ok(())
            }
            IrNode::Optional { inner, condition } => {
                self.start_line();
                self.out.push_str("OPTIONAL {");
                self.end_line();
                self.indent += 1;
                self.render_bgp(inner)?;
                if let Some(condition) = condition {
                    self.render_filter(condition)?;
                }
                self.indent -= 1;
                self.start_line();
                self.out.push('}');
                self.end_line();
                Ok(())
            }
            IrNode::Minus { inner } => {
                self.start_line();
                self.out.push_str("MINUS {");
                self.end_line();
                self.render_block(inner)?;
                Ok(())
            }
            IrNode::Union { branches, .. } => {
                for (i, branch) in branches.iter().enumerate() {
                    self.start_line();
                    self.out.push_str(if i == 0 { "{" } else { "} UNION {" });
                    self.end_line();
                    self.indent += 1;
                    self.render_bgp(branch)?;
                    self.indent -= 1;
                }
                self.start_line();
                self.out.push('}');
                self.end_line();
                Ok(())
            }
            IrNode::Filter { condition } => self.render_filter(condition),
            IrNode::Bind {
                expression,
                variable,
            } => {
                self.start_line();
                self.out.push_str("BIND(");
                self.write_expression(expression, &[])?;
                self.out.push_str(" AS ");
                self.write_variable(variable)?;
                self.out.push(')');
                self.end_line();
                Ok(())
            }
            IrNode::Values { variables, rows } => self.render_values(variables, rows),
            IrNode::SubSelect(select) => {
                self.start_line();
                self.out.push('{');
                self.end_line();
                self.indent += 1;
                self.render_select(select)?;
                self.indent -= 1;
                self.start_line();
                self.out.push('}');
                self.end_line();
                Ok(())
            }
        }
    }

    fn render_block(&mut self, inner: &IrBgp) -> Result<(), RenderError> {
        self.indent += 1;
        self.render_bgp(inner)?;
        self.indent -= 1;
        self.start_line();
        self.out.push('}');
        self.end_line();
        Ok(())
    }

    fn render_filter(&mut self, condition: &Expression) -> Result<(), RenderError> {
        let exists_form = matches!(condition, Expression::Exists(_))
            || matches!(condition, Expression::Not(inner)
                if matches!(inner.as_ref(), Expression::Exists(_)));
        self.start_line();
        if exists_form {
            self.out.push_str("FILTER ");
            self.write_expression(condition, &[])?;
        } else {
            self.out.push_str("FILTER(");
            self.write_expression(condition, &[])?;
            self.out.push(')');
        }
        self.end_line();
        Ok(())
    }

    fn render_values(
        &mut self,
        variables: &[TrackedVar],
        rows: &[Vec<Option<GroundTerm>>],
    ) -> Result<(), RenderError> {
        self.start_line();
        self.out.push_str("VALUES ");
        if let [only] = variables {
            self.write_variable(only)?;
        } else {
            self.out.push('(');
            for (i, var) in variables.iter().enumerate() {
                if i > 0 {
                    self.out.push(' ');
                }
                self.write_variable(var)?;
            }
            self.out.push(')');
        }
        self.out.push_str(" {");
        let mut rendered: Vec<String> = rows
            .iter()
            .map(|row| self.render_values_row(variables.len(), row))
            .collect();
        if !self.config.values_preserve_order {
            rendered.sort_unstable();
        }
        if !rendered.is_empty() {
            self.out.push(' ');
            let _ = write!(self.out, "{}", rendered.iter().format(" "));
        }
        self.out.push_str(" }");
        self.end_line();
        Ok(())
    }

    fn render_values_row(&self, columns: usize, row: &[Option<GroundTerm>]) -> String {
        let mut out = String::new();
        if columns != 1 {
            out.push('(');
        }
        for (i, cell) in row.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            match cell {
                Some(term) => write_ground_term(&mut out, term, &self.config.prefixes),
                None => out.push_str("UNDEF"),
            }
        }
        if columns != 1 {
            out.push(')');
        }
        out
    }

    pub(crate) fn write_pattern_term(
        &mut self,
        term: &PatternTerm,
    ) -> Result<(), RenderError> {
        if let Some(var) = term.as_variable() {
            return self.write_variable(var);
        }
        term.write_sparql(&mut self.out, &self.config.prefixes);
        Ok(())
    }

    fn write_name(&mut self, name: &PredicatePattern) -> Result<(), RenderError> {
        match name {
            PredicatePattern::NamedNode(_) => {
                name.write_sparql(&mut self.out, &self.config.prefixes);
                Ok(())
            }
            PredicatePattern::Variable(var) => self.write_variable(var),
        }
    }

    pub(crate) fn write_variable(&mut self, var: &TrackedVar) -> Result<(), RenderError> {
        if var.origin() != VarOrigin::User {
            return Err(RenderError::RenderInvariantViolation(format!(
                "generated variable ?{} survived path reconstruction",
                var.name()
            )));
        }
        let _ = write!(self.out, "{var}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::reconstruct;
    use unsparql_algebra::parse_and_lower;

    fn example_config() -> RenderConfig {
        let mut config = RenderConfig::default();
        config.prefixes.insert("ex", "http://example.org/");
        config
    }

    fn render_text_with(query: &str, config: &RenderConfig) -> String {
        let mut select = crate::convert(&parse_and_lower(query).unwrap()).unwrap();
        reconstruct(&mut select).unwrap();
        render(&select, config).unwrap()
    }

    fn render_text(query: &str) -> String {
        render_text_with(query, &example_config())
    }

    #[test]
    fn sequence_path_renders_on_one_line() {
        insta::assert_snapshot!(render_text(
            "PREFIX ex: <http://example.org/> SELECT ?s ?o WHERE { ?s ex:a/ex:b ?o }"
        ), @r#"
        PREFIX ex: <http://example.org/>
        SELECT ?s ?o WHERE {
          ?s ex:a/ex:b ?o .
        }
        "#);
    }

    #[test]
    fn optional_condition_renders_as_inner_filter() {
        insta::assert_snapshot!(render_text(
            "PREFIX ex: <http://example.org/> SELECT ?s WHERE { ?s ex:a ?o OPTIONAL { ?o ex:b ?z FILTER(?z > 1) } }"
        ), @r#"
        PREFIX ex: <http://example.org/>
        SELECT ?s WHERE {
          ?s ex:a ?o .
          OPTIONAL {
            ?o ex:b ?z .
            FILTER(?z > 1)
          }
        }
        "#);
    }

    #[test]
    fn union_branches_get_one_brace_pair_each() {
        insta::assert_snapshot!(render_text(
            "PREFIX ex: <http://example.org/> SELECT ?s ?o WHERE { { ?s ex:a ?o } UNION { ?s ex:b ?o } }"
        ), @r#"
        PREFIX ex: <http://example.org/>
        SELECT ?s ?o WHERE {
          {
            ?s ex:a ?o .
          } UNION {
            ?s ex:b ?o .
          }
        }
        "#);
    }

    #[test]
    fn values_rows_sort_when_order_is_not_preserved() {
        let mut config = RenderConfig::default();
        config.values_preserve_order = false;
        insta::assert_snapshot!(render_text_with(
            "SELECT ?x WHERE { VALUES ?x { \"b\" \"a\" } }",
            &config,
        ), @r#"
        SELECT ?x WHERE {
          VALUES ?x { "a" "b" }
        }
        "#);
    }

    #[test]
    fn filter_exists_body_gets_paths_resugared() {
        insta::assert_snapshot!(render_text(
            "PREFIX ex: <http://example.org/> SELECT ?s WHERE { ?s ex:a ?o FILTER EXISTS { ?o ex:b/ex:c ?z } }"
        ), @r#"
        PREFIX ex: <http://example.org/>
        SELECT ?s WHERE {
          ?s ex:a ?o .
          FILTER EXISTS {
            ?o ex:b/ex:c ?z .
          }
        }
        "#);
    }

    #[test]
    fn subselect_renders_as_braced_block() {
        insta::assert_snapshot!(render_text(
            "PREFIX ex: <http://example.org/> SELECT ?s WHERE { ?s ex:p ?o . { SELECT ?o WHERE { ?o ex:q ?z } LIMIT 3 } }"
        ), @r#"
        PREFIX ex: <http://example.org/>
        SELECT ?s WHERE {
          ?s ex:p ?o .
          {
            SELECT ?o WHERE {
              ?o ex:q ?z .
            }
            LIMIT 3
          }
        }
        "#);
    }

    #[test]
    fn aggregates_render_in_projection_and_having() {
        insta::assert_snapshot!(render_text(
            "PREFIX ex: <http://example.org/> SELECT ?s (SUM(?v) AS ?total) WHERE { ?s ex:p ?v } GROUP BY ?s HAVING(SUM(?v) > 10) ORDER BY DESC(?total) LIMIT 5"
        ), @r#"
        PREFIX ex: <http://example.org/>
        SELECT ?s (SUM(?v) AS ?total) WHERE {
          ?s ex:p ?v .
        }
        GROUP BY ?s
        HAVING(SUM(?v) > 10)
        ORDER BY DESC(?total)
        LIMIT 5
        "#);
    }

    #[test]
    fn negated_set_with_mixed_members_renders_canonically() {
        insta::assert_snapshot!(render_text(
            "PREFIX ex: <http://example.org/> SELECT ?s ?o WHERE { ?s !(ex:pA|^ex:pB) ?o }"
        ), @r#"
        PREFIX ex: <http://example.org/>
        SELECT ?s ?o WHERE {
          ?s !(ex:pA|^ex:pB) ?o .
        }
        "#);
    }

    #[test]
    fn debug_ir_dumps_both_stages_inside_comments() {
        let mut config = example_config();
        config.debug_ir = true;
        let mut select = crate::convert(
            &parse_and_lower(
                "PREFIX ex: <http://example.org/> SELECT ?s ?o WHERE { ?s ex:a/ex:b ?o }",
            )
            .unwrap(),
        )
        .unwrap();
        let raw = select.clone();
        reconstruct(&mut select).unwrap();
        let text = render_traced(&select, Some(&raw), &config).unwrap();
        assert!(text.contains("# IR (raw)"));
        assert!(text.contains("# IR (transformed)"));
        // The raw dump still shows the desugared steps, the transformed one
        // the fused path.
        assert!(text.contains("StatementPattern"));
        assert!(text.contains("PathTriple"));
        spargebra::Query::parse(&text, None).unwrap();
    }
}
