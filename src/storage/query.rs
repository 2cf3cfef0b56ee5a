// Query - conjunctive field predicates over rule records
//
// Built fluently: Query::where_field(Field::PolicyType).eq("p").and(Field::V0).eq("alice")

use crate::rule::{Field, PolicyRecord};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub field: Field,
    pub op: Op,
    pub value: String,
}

impl Predicate {
    pub fn matches(&self, record: &PolicyRecord) -> bool {
        let actual = record.get(self.field);
        match self.op {
            Op::Eq => actual == self.value,
            Op::Ne => actual != self.value,
        }
    }
}

/// An AND of predicates. An empty query matches every record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    predicates: Vec<Predicate>,
}

/// A query waiting for the comparison on its last selected field
#[derive(Debug, Clone)]
pub struct Criterion {
    query: Query,
    field: Field,
}

impl Query {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn where_field(field: Field) -> Criterion {
        Criterion {
            query: Self::default(),
            field,
        }
    }

    pub fn and(self, field: Field) -> Criterion {
        Criterion { query: self, field }
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn matches(&self, record: &PolicyRecord) -> bool {
        self.predicates.iter().all(|p| p.matches(record))
    }
}

impl Criterion {
    pub fn eq(self, value: impl Into<String>) -> Query {
        self.push(Op::Eq, value.into())
    }

    pub fn ne(self, value: impl Into<String>) -> Query {
        self.push(Op::Ne, value.into())
    }

    fn push(self, op: Op, value: String) -> Query {
        let mut query = self.query;
        query.predicates.push(Predicate {
            field: self.field,
            op,
            value,
        });
        query
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.predicates.is_empty() {
            return write!(f, "*");
        }
        for (i, p) in self.predicates.iter().enumerate() {
            if i > 0 {
                write!(f, " AND ")?;
            }
            let op = match p.op {
                Op::Eq => "=",
                Op::Ne => "!=",
            };
            write!(f, "{} {} {:?}", p.field.name(), op, p.value)?;
        }
        Ok(())
    }
}
