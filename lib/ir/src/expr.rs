use crate::render::Renderer;
use crate::{RenderError, convert, transform};
use oxrdf::vocab::xsd;
use oxrdf::Literal;
use spargebra::algebra::{
    AggregateExpression, AggregateFunction, Expression, GraphPattern,
};
use std::fmt::Write;
use unsparql_algebra::{BridgeVarAllocator, lower_pattern};
use unsparql_model::{TrackedVar, write_literal, write_named_node};

type Aggregates = [(TrackedVar, AggregateExpression)];

/// Expression serialization.
///
/// Operands of binary operators are parenthesized whenever they are not
/// atomic, which sidesteps operator-precedence bookkeeping at the cost of a
/// few redundant parentheses. `EXISTS` patterns run through the full
/// lowering and reconstruction pipeline so property paths inside them come
/// out resugared as well.
impl Renderer<'_> {
    pub(crate) fn write_expression(
        &mut self,
        expr: &Expression,
        aggregates: &Aggregates,
    ) -> Result<(), RenderError> {
        match expr {
            Expression::NamedNode(n) => {
                write_named_node(&mut self.out, n.as_ref(), &self.config.prefixes);
                Ok(())
            }
            Expression::Literal(literal) => {
                self.write_expression_literal(literal);
                Ok(())
            }
            Expression::Variable(var) => {
                // An aggregate output variable stands for its aggregate.
                if let Some((_, agg)) = aggregates
                    .iter()
                    .find(|(target, _)| target.name() == var.as_str())
                {
                    return self.write_aggregate(agg);
                }
                let _ = write!(self.out, "{var}");
                Ok(())
            }
            Expression::Bound(var) => {
                let _ = write!(self.out, "BOUND({var})");
                Ok(())
            }
            Expression::Or(a, b) => self.write_binary(a, "||", b, aggregates),
            Expression::And(a, b) => self.write_binary(a, "&&", b, aggregates),
            Expression::Equal(a, b) => self.write_binary(a, "=", b, aggregates),
            Expression::Greater(a, b) => self.write_binary(a, ">", b, aggregates),
            Expression::GreaterOrEqual(a, b) => self.write_binary(a, ">=", b, aggregates),
            Expression::Less(a, b) => self.write_binary(a, "<", b, aggregates),
            Expression::LessOrEqual(a, b) => self.write_binary(a, "<=", b, aggregates),
            Expression::Add(a, b) => self.write_binary(a, "+", b, aggregates),
            Expression::Subtract(a, b) => self.write_binary(a, "-", b, aggregates),
            Expression::Multiply(a, b) => self.write_binary(a, "*", b, aggregates),
            Expression::Divide(a, b) => self.write_binary(a, "/", b, aggregates),
            Expression::SameTerm(a, b) => {
                self.out.push_str("sameTerm(");
                self.write_expression(a, aggregates)?;
                self.out.push_str(", ");
                self.write_expression(b, aggregates)?;
                self.out.push(')');
                Ok(())
            }
            Expression::In(needle, haystack) => {
                self.write_operand(needle, aggregates)?;
                self.out.push_str(" IN (");
                for (i, member) in haystack.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.write_expression(member, aggregates)?;
                }
                self.out.push(')');
                Ok(())
            }
            Expression::UnaryPlus(inner) => {
                self.out.push('+');
                self.write_operand(inner, aggregates)
            }
            Expression::UnaryMinus(inner) => {
                self.out.push('-');
                self.write_operand(inner, aggregates)
            }
            Expression::Not(inner) => match inner.as_ref() {
                // The parser turns `a != b` into a negated equality; render
                // the operator the user wrote.
                Expression::Equal(a, b) => self.write_binary(a, "!=", b, aggregates),
                Expression::Exists(pattern) => {
                    self.out.push_str("NOT EXISTS {");
                    self.write_exists_block(pattern)
                }
                _ => {
                    self.out.push('!');
                    self.write_operand(inner, aggregates)
                }
            },
            Expression::Exists(pattern) => {
                self.out.push_str("EXISTS {");
                self.write_exists_block(pattern)
            }
            Expression::If(condition, then, otherwise) => {
                self.out.push_str("IF(");
                self.write_expression(condition, aggregates)?;
                self.out.push_str(", ");
                self.write_expression(then, aggregates)?;
                self.out.push_str(", ");
                self.write_expression(otherwise, aggregates)?;
                self.out.push(')');
                Ok(())
            }
            Expression::Coalesce(args) => {
                self.out.push_str("COALESCE(");
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.write_expression(arg, aggregates)?;
                }
                self.out.push(')');
                Ok(())
            }
            Expression::FunctionCall(function, args) => {
                let _ = write!(self.out, "{function}");
                self.out.push('(');
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.write_expression(arg, aggregates)?;
                }
                self.out.push(')');
                Ok(())
            }
        }
    }

    fn write_binary(
        &mut self,
        left: &Expression,
        op: &str,
        right: &Expression,
        aggregates: &Aggregates,
    ) -> Result<(), RenderError> {
        self.write_operand(left, aggregates)?;
        let _ = write!(self.out, " {op} ");
        self.write_operand(right, aggregates)
    }

    fn write_operand(
        &mut self,
        expr: &Expression,
        aggregates: &Aggregates,
    ) -> Result<(), RenderError> {
        if is_atomic(expr) {
            self.write_expression(expr, aggregates)
        } else {
            self.out.push('(');
            self.write_expression(expr, aggregates)?;
            self.out.push(')');
            Ok(())
        }
    }

    /// Numeric and boolean literals in canonical lexical form render as bare
    /// tokens; everything else keeps the quoted form.
    fn write_expression_literal(&mut self, literal: &Literal) {
        let value = literal.value();
        let bare = match literal.datatype() {
            xsd::INTEGER => {
                let digits = value.strip_prefix('-').unwrap_or(value);
                !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
            }
            xsd::BOOLEAN => value == "true" || value == "false",
            _ => false,
        };
        if bare {
            self.out.push_str(value);
        } else {
            write_literal(&mut self.out, literal, &self.config.prefixes);
        }
    }

    pub(crate) fn write_aggregate(
        &mut self,
        agg: &AggregateExpression,
    ) -> Result<(), RenderError> {
        match agg {
            AggregateExpression::CountSolutions { distinct } => {
                self.out.push_str(if *distinct {
                    "COUNT(DISTINCT *)"
                } else {
                    "COUNT(*)"
                });
                Ok(())
            }
            AggregateExpression::FunctionCall {
                name,
                expr,
                distinct,
            } => {
                let mut separator = None;
                match name {
                    AggregateFunction::Count => self.out.push_str("COUNT"),
                    AggregateFunction::Sum => self.out.push_str("SUM"),
                    AggregateFunction::Avg => self.out.push_str("AVG"),
                    AggregateFunction::Min => self.out.push_str("MIN"),
                    AggregateFunction::Max => self.out.push_str("MAX"),
                    AggregateFunction::Sample => self.out.push_str("SAMPLE"),
                    AggregateFunction::GroupConcat { separator: sep } => {
                        self.out.push_str("GROUP_CONCAT");
                        separator = sep.as_deref();
                    }
                    AggregateFunction::Custom(iri) => {
                        write_named_node(&mut self.out, iri.as_ref(), &self.config.prefixes);
                    }
                }
                self.out.push('(');
                if *distinct {
                    self.out.push_str("DISTINCT ");
                }
                // Aggregate arguments cannot themselves reference aggregate
                // outputs.
                self.write_expression(expr, &[])?;
                if let Some(separator) = separator {
                    self.out.push_str("; SEPARATOR=\"");
                    for c in separator.chars() {
                        match c {
                            '"' => self.out.push_str("\\\""),
                            '\\' => self.out.push_str("\\\\"),
                            _ => self.out.push(c),
                        }
                    }
                    self.out.push('"');
                }
                self.out.push(')');
                Ok(())
            }
        }
    }

    /// Finishes an `EXISTS {` / `NOT EXISTS {` block. The pattern arrives as
    /// parsed, so it goes through lowering and reconstruction like a query
    /// body before rendering.
    fn write_exists_block(&mut self, pattern: &GraphPattern) -> Result<(), RenderError> {
        self.end_exists_header();
        self.indent += 1;
        let mut alloc = BridgeVarAllocator::new();
        let lowered = lower_pattern(pattern, &mut alloc)?;
        let mut bgp = convert::convert_bgp(&lowered)?;
        transform::reconstruct_bgp(&mut bgp)?;
        self.render_bgp(&bgp)?;
        self.indent -= 1;
        self.write_exists_footer();
        Ok(())
    }

    fn end_exists_header(&mut self) {
        self.out.push('\n');
    }

    fn write_exists_footer(&mut self) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
        self.out.push('}');
    }
}

fn is_atomic(expr: &Expression) -> bool {
    matches!(
        expr,
        Expression::NamedNode(_)
            | Expression::Literal(_)
            | Expression::Variable(_)
            | Expression::Bound(_)
            | Expression::If(_, _, _)
            | Expression::Coalesce(_)
            | Expression::FunctionCall(_, _)
    )
}
