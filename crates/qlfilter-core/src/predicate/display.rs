use crate::{
    predicate::{
        CompiledFilter, ComparePredicate, CompareOp, Join, JoinMode, LikePredicate, Operand,
        Predicate, Scope, Source, Subquery,
    },
    resolve::Leaf,
};
use std::fmt::{self, Write as _};

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => f.write_str("root"),
            Self::Join(id) => write!(f, "{id}"),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.leaf {
            Leaf::Attribute(name) => write!(f, "{}.{name}", self.source),
            Leaf::MapKey => write!(f, "key({})", self.source),
            Leaf::MapValue => write!(f, "value({})", self.source),
        }
    }
}

impl fmt::Display for Join {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self.mode {
            JoinMode::Left => "left",
            JoinMode::Inner => "inner",
        };
        write!(
            f,
            "{mode} join {}.{} {} ({:?})",
            self.parent, self.attribute, self.id, self.cardinality
        )
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, join) in self.joins.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{join}")?;
        }

        Ok(())
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::True => f.write_str("TRUE"),
            Self::And(children) => write_group(f, "AND", children),
            Self::Or(children) => write_group(f, "OR", children),
            Self::Not(inner) => write!(f, "NOT ({inner})"),
            Self::Compare(compare) => write_compare(f, compare),
            Self::Like(like) => write_like(f, like),
            Self::IsNull(operand) => write!(f, "{operand} IS NULL"),
            Self::IsNotNull(operand) => write!(f, "{operand} IS NOT NULL"),
            Self::Exists(subquery) => write_subquery(f, "EXISTS", subquery),
            Self::NotExists(subquery) => write_subquery(f, "NOT EXISTS", subquery),
        }
    }
}

impl fmt::Display for CompiledFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.entity_kind, self.model)?;
        if !self.scope.joins.is_empty() {
            write!(f, " {}", self.scope)?;
        }
        write!(f, " WHERE {}", self.predicate)
    }
}

fn write_group(f: &mut fmt::Formatter<'_>, keyword: &str, children: &[Predicate]) -> fmt::Result {
    f.write_char('(')?;
    for (index, child) in children.iter().enumerate() {
        if index > 0 {
            write!(f, " {keyword} ")?;
        }
        write!(f, "{child}")?;
    }
    f.write_char(')')
}

fn write_folded(f: &mut fmt::Formatter<'_>, fold: bool, text: &dyn fmt::Display) -> fmt::Result {
    if fold {
        write!(f, "UPPER({text})")
    } else {
        write!(f, "{text}")
    }
}

fn write_compare(f: &mut fmt::Formatter<'_>, compare: &ComparePredicate) -> fmt::Result {
    let fold = compare.case.folds();
    write_folded(f, fold, &compare.operand)?;
    write!(f, " {} ", compare.op.symbol())?;

    if compare.op == CompareOp::In {
        f.write_char('(')?;
        for (index, value) in compare.values.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write_folded(f, fold, value)?;
        }
        f.write_char(')')
    } else {
        match compare.values.first() {
            Some(value) => write_folded(f, fold, value),
            None => f.write_str("()"),
        }
    }
}

fn write_like(f: &mut fmt::Formatter<'_>, like: &LikePredicate) -> fmt::Result {
    let fold = like.case.folds();
    write_folded(f, fold, &like.operand)?;
    f.write_str(" LIKE ")?;
    write_folded(f, fold, &format_args!("'{}'", like.pattern))
}

fn write_subquery(f: &mut fmt::Formatter<'_>, keyword: &str, subquery: &Subquery) -> fmt::Result {
    write!(f, "{keyword} (on {}", subquery.identifier)?;
    if !subquery.scope.joins.is_empty() {
        write!(f, " {}", subquery.scope)?;
    }
    write!(f, " WHERE {})", subquery.predicate)
}
