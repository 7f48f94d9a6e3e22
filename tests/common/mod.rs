//! Shared fixtures for the integration tests: entities and a scripted session that
//! records every statement it receives

#![allow(dead_code)]

use async_trait::async_trait;
use dbhelper::prelude::*;
use dbhelper::store_object::{SessionError, TransactionScope};
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Address {
    pub city: String,
    pub zip: String,
}

#[model]
#[table(name = "t_student")]
pub struct Student {
    #[primary_key]
    #[auto_increment]
    pub id: Option<i64>,

    pub name: String,

    pub age: Option<i32>,

    pub school_id: Option<i64>,

    #[field(json)]
    pub address: Option<Address>,

    #[field(readonly)]
    pub created_at: Option<DateTime<Utc>>,

    #[field(skip)]
    pub rank: Option<i32>,

    #[soft_delete]
    pub deleted: bool,
}

impl Student {
    pub fn named(name: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            age: None,
            school_id: None,
            address: None,
            created_at: None,
            rank: None,
            deleted: false,
        }
    }
}

#[model]
#[table(name = "t_school")]
pub struct School {
    #[primary_key]
    pub id: i64,

    pub name: String,
}

#[model]
#[table(name = "t_course")]
pub struct Course {
    #[primary_key]
    pub id: i64,

    pub student_id: i64,

    pub title: String,

    #[soft_delete]
    pub removed: i32,
}

#[derive(Debug, JoinedEntity)]
pub struct StudentDetail {
    #[join(alias = "t1")]
    pub student: Student,

    #[join(alias = "t2", on = "t1.school_id = t2.id")]
    pub school: Option<School>,

    #[join(alias = "t3", on = "t1.id = t3.student_id")]
    pub courses: Vec<Course>,
}

#[model]
#[table(name = "t_tag")]
pub struct Tag {
    #[primary_key]
    pub id: i64,

    pub label: String,
}

/// One hard-delete entity joined to itself under two aliases
#[derive(Debug, JoinedEntity)]
pub struct TagTwins {
    #[join(alias = "t1")]
    pub tag: Tag,

    #[join(alias = "t2", on = "t1.id = t2.id")]
    pub left: Tag,

    #[join(alias = "t3", on = "t1.id = t3.id")]
    pub right: Option<Tag>,
}

/// One flat row of the tag self-join, every alias reading the same source row
pub fn tag_twins_row(id: i64, label: &str) -> Row {
    ["t1", "t2", "t3"].iter().fold(Row::new(), |row, alias| {
        row.with(format!("{alias}__id"), id)
            .with(format!("{alias}__label"), label)
    })
}

pub const STUDENT_COLUMNS: &str = "id, name, age, school_id, address, created_at, deleted";

/// Un-prefixed row of a live student
pub fn student_row(id: i64, name: &str) -> Row {
    Row::new()
        .with("id", id)
        .with("name", name)
        .with("age", SqlValue::Null)
        .with("school_id", SqlValue::Null)
        .with("address", SqlValue::Null)
        .with("created_at", SqlValue::Null)
        .with("deleted", false)
}

pub fn count_row(total: i64) -> Row {
    Row::new().with("total", total)
}

/// One flat row of the student/school/course join
pub fn detail_row(
    student: (i64, &str, Option<i64>),
    school: Option<(i64, &str)>,
    course: Option<(i64, &str)>,
) -> Row {
    let (student_id, student_name, school_id) = student;
    let mut row = Row::new()
        .with("t1__id", student_id)
        .with("t1__name", student_name)
        .with("t1__age", SqlValue::Null)
        .with("t1__school_id", school_id)
        .with("t1__address", SqlValue::Null)
        .with("t1__created_at", SqlValue::Null)
        .with("t1__deleted", false);

    match school {
        Some((id, name)) => {
            row = row.with("t2__id", id).with("t2__name", name);
        }
        None => {
            row = row.with("t2__id", SqlValue::Null).with("t2__name", SqlValue::Null);
        }
    }

    match course {
        Some((id, title)) => row
            .with("t3__id", id)
            .with("t3__student_id", student_id)
            .with("t3__title", title)
            .with("t3__removed", 0),
        None => row
            .with("t3__id", SqlValue::Null)
            .with("t3__student_id", SqlValue::Null)
            .with("t3__title", SqlValue::Null)
            .with("t3__removed", SqlValue::Null),
    }
}

/// Statement received by [`RecordingSession`]
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

enum Reply {
    Rows(Vec<Row>),
    Affected(u64),
    Fail(String),
}

/// Session answering from a script, in call order. An exhausted script answers with no
/// rows and zero affected rows.
#[derive(Default)]
pub struct RecordingSession {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<Call>>,
    scope: Option<TransactionScope>,
}

impl RecordingSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session running inside an open transaction
    pub fn transactional() -> Self {
        Self {
            scope: Some(TransactionScope::new()),
            ..Self::default()
        }
    }

    pub fn rows(self, rows: Vec<Row>) -> Self {
        self.push(Reply::Rows(rows))
    }

    pub fn affected(self, count: u64) -> Self {
        self.push(Reply::Affected(count))
    }

    pub fn fail(self, message: &str) -> Self {
        self.push(Reply::Fail(message.to_string()))
    }

    fn push(self, reply: Reply) -> Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn scope(&self) -> &TransactionScope {
        self.scope.as_ref().expect("session is not transactional")
    }

    fn record(&self, sql: &str, params: &[SqlValue]) -> Option<Reply> {
        self.calls.lock().unwrap().push(Call {
            sql: sql.to_string(),
            params: params.to_vec(),
        });
        self.replies.lock().unwrap().pop_front()
    }
}

#[async_trait]
impl DatabaseSession for RecordingSession {
    async fn fetch(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, SessionError> {
        match self.record(sql, params) {
            Some(Reply::Rows(rows)) => Ok(rows),
            Some(Reply::Fail(message)) => Err(message.into()),
            Some(Reply::Affected(_)) | None => Ok(Vec::new()),
        }
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64, SessionError> {
        match self.record(sql, params) {
            Some(Reply::Affected(count)) => Ok(count),
            Some(Reply::Fail(message)) => Err(message.into()),
            Some(Reply::Rows(_)) | None => Ok(0),
        }
    }

    fn transaction(&self) -> Option<&dyn TransactionContext> {
        self.scope.as_ref().map(|scope| scope as &dyn TransactionContext)
    }
}
