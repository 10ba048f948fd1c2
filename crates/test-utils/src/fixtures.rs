// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Test fixtures built around a small school schema
//!
//! ```text
//! school.Student(id, name, gender, class_id)
//! school.Class(id, name, open)
//! ClubStudent(studentId, clubId)
//! ```

use typed_sql_ir::{
    BinaryExpr, ColumnDef, CreateTable, Delete, Expr, FromTable, FunctionExpr, InExpr, Insert,
    JoinClause, JoinOperator, Query, SchemaTable, SortDirection, Statement, Update, col, col_of,
    value,
};

/// Sample IR trees for testing
pub struct IrFixtures;

impl IrFixtures {
    /// `left = right`
    pub fn eq(left: Expr, right: Expr) -> Expr {
        match BinaryExpr::new("=", left, right) {
            Ok(expr) => expr.into(),
            Err(e) => panic!("fixture expression is invalid: {}", e),
        }
    }

    // ===== Queries =====

    /// `SELECT * FROM Student WHERE gender = "F"`
    pub fn female_students() -> Query {
        Query::builder()
            .from("Student")
            .where_clause(Self::eq(col("gender"), value("F")))
            .build()
    }

    /// Students joined to their open class, ordered by name
    pub fn students_with_class() -> Query {
        let join = JoinClause::new(
            JoinOperator::Left,
            SchemaTable::new("Class").with_alias("c"),
            [Self::eq(col_of("s", "class_id"), col_of("c", "id"))],
        )
        .unwrap_or_else(|e| panic!("fixture join is invalid: {}", e));
        Query::builder()
            .select(col_of("s", "name"))
            .select_as(col_of("c", "name"), "class")
            .from(FromTable::new(SchemaTable::new("Student").with_alias("s")).join(join))
            .order_by(col_of("s", "name"), SortDirection::Asc)
            .build()
    }

    /// Students belonging to any club, counted
    pub fn club_member_count() -> Query {
        let members = Query::builder()
            .select(col("studentId"))
            .from("ClubStudent")
            .build();
        let count = FunctionExpr::call("COUNT", [col("*")])
            .unwrap_or_else(|e| panic!("fixture function is invalid: {}", e));
        let in_clubs =
            InExpr::new(col("id"), members).unwrap_or_else(|e| panic!("fixture IN is invalid: {}", e));
        Query::builder()
            .select(count)
            .from("Student")
            .where_clause(in_clubs)
            .build()
    }

    // ===== Statements =====

    pub fn create_student_table() -> CreateTable {
        let mut builder = CreateTable::builder("Student");
        let columns = [
            ColumnDef::new("id", "INTEGER").primary_key().auto_increment(),
            ColumnDef::new("name", "VARCHAR").with_length(64).not_null(),
            ColumnDef::new("gender", "CHAR").with_length(1).not_null(),
            ColumnDef::new("class_id", "INTEGER"),
        ];
        for column in columns {
            if let Err(e) = builder.column(column) {
                panic!("fixture column is invalid: {}", e);
            }
        }
        builder.schema("school").if_not_exists(true).build()
    }

    pub fn insert_students() -> Insert {
        let mut builder = Insert::builder("Student");
        let result = builder
            .columns(["name", "gender"])
            .and_then(|b| b.values([value("Kennys Ng"), value("M")]))
            .and_then(|b| b.values([value("Mary"), value("F")]));
        if let Err(e) = result {
            panic!("fixture insert is invalid: {}", e);
        }
        builder.build()
    }

    pub fn rename_student() -> Update {
        Update::builder("Student")
            .set("name", value("Kenny"))
            .where_clause(Self::eq(col("id"), value(1)))
            .build()
    }

    pub fn delete_graduates() -> Delete {
        Delete::builder("Student")
            .where_clause(Self::eq(col("gender"), value("F")))
            .where_clause(Self::eq(col("year"), value(4)))
            .build()
    }

    /// One statement of every data-manipulating kind plus a query
    pub fn statements() -> Vec<Statement> {
        vec![
            Self::create_student_table().into(),
            Self::insert_students().into(),
            Self::female_students().into(),
            Self::students_with_class().into(),
            Self::club_member_count().into(),
            Self::rename_student().into(),
            Self::delete_graduates().into(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use typed_sql_ir::SqlNode;

    #[test]
    fn test_fixtures_validate() {
        for statement in IrFixtures::statements() {
            assert!(statement.validate().is_ok(), "{} is invalid", statement);
        }
    }

    #[test]
    fn test_female_students_sql() {
        assert_eq!(
            IrFixtures::female_students().to_sql().unwrap(),
            "SELECT * FROM `Student` WHERE `gender` = \"F\""
        );
    }
}
