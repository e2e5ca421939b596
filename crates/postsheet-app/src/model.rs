// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

use crate::ids::RowId;

pub const STATUS_ALL_POSTED: &str = "All posts were successful!";
pub const STATUS_DISPATCH_FAILED: &str = "Some posts failed. Check the log for details.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub id: RowId,
    pub account: String,
    pub business_account: String,
    pub content_a: String,
    pub content_b: String,
    pub content_c: String,
    pub label: String,
}

impl Row {
    pub fn empty(id: RowId) -> Self {
        Self {
            id,
            account: String::new(),
            business_account: String::new(),
            content_a: String::new(),
            content_b: String::new(),
            content_c: String::new(),
            label: String::new(),
        }
    }

    pub fn field(&self, field: RowField) -> &str {
        match field {
            RowField::Account => &self.account,
            RowField::BusinessAccount => &self.business_account,
            RowField::Label => &self.label,
            RowField::ContentA => &self.content_a,
            RowField::ContentB => &self.content_b,
            RowField::ContentC => &self.content_c,
        }
    }

    pub fn field_mut(&mut self, field: RowField) -> &mut String {
        match field {
            RowField::Account => &mut self.account,
            RowField::BusinessAccount => &mut self.business_account,
            RowField::Label => &mut self.label,
            RowField::ContentA => &mut self.content_a,
            RowField::ContentB => &mut self.content_b,
            RowField::ContentC => &mut self.content_c,
        }
    }

    /// Content fields in posting order, paired with the field they came from.
    pub fn contents(&self) -> [(RowField, &str); 3] {
        [
            (RowField::ContentA, &self.content_a),
            (RowField::ContentB, &self.content_b),
            (RowField::ContentC, &self.content_c),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RowField {
    Account,
    BusinessAccount,
    Label,
    ContentA,
    ContentB,
    ContentC,
}

impl RowField {
    /// Column order used by the grid and by every export format.
    pub const ALL: [Self; 6] = [
        Self::Account,
        Self::BusinessAccount,
        Self::Label,
        Self::ContentA,
        Self::ContentB,
        Self::ContentC,
    ];

    pub const CONTENT: [Self; 3] = [Self::ContentA, Self::ContentB, Self::ContentC];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::BusinessAccount => "business_account",
            Self::Label => "label",
            Self::ContentA => "content_a",
            Self::ContentB => "content_b",
            Self::ContentC => "content_c",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "account" => Some(Self::Account),
            "business_account" => Some(Self::BusinessAccount),
            "label" => Some(Self::Label),
            "content_a" => Some(Self::ContentA),
            "content_b" => Some(Self::ContentB),
            "content_c" => Some(Self::ContentC),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::BusinessAccount => "business",
            Self::Label => "label",
            Self::ContentA => "post A",
            Self::ContentB => "post B",
            Self::ContentC => "post C",
        }
    }

    pub const fn is_content(self) -> bool {
        matches!(self, Self::ContentA | Self::ContentB | Self::ContentC)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub const fn indicator(self) -> &'static str {
        match self {
            Self::Asc => "▲",
            Self::Desc => "▼",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortState {
    #[default]
    Unsorted,
    Ascending(RowField),
    Descending(RowField),
}

impl SortState {
    /// Next state after the user asks to sort by `field`.
    pub fn next(self, field: RowField) -> Self {
        match self {
            Self::Ascending(current) if current == field => Self::Descending(field),
            _ => Self::Ascending(field),
        }
    }

    pub const fn field(self) -> Option<RowField> {
        match self {
            Self::Unsorted => None,
            Self::Ascending(field) | Self::Descending(field) => Some(field),
        }
    }

    pub const fn direction(self) -> Option<SortDirection> {
        match self {
            Self::Unsorted => None,
            Self::Ascending(_) => Some(SortDirection::Asc),
            Self::Descending(_) => Some(SortDirection::Desc),
        }
    }

    /// Header marker for `field`, empty unless it is the active sort column.
    pub fn indicator_for(self, field: RowField) -> &'static str {
        match (self.field(), self.direction()) {
            (Some(active), Some(direction)) if active == field => direction.indicator(),
            _ => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestResult {
    Delivered { status: u16 },
    Failed { error: String },
}

impl RequestResult {
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

/// Result of one POST issued for one content field of one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostOutcome {
    pub row_id: RowId,
    pub account: String,
    pub field: RowField,
    pub result: RequestResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PostReport {
    pub outcomes: Vec<PostOutcome>,
}

impl PostReport {
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    pub fn delivered(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.result.is_ok())
            .count()
    }

    pub fn failed(&self) -> usize {
        self.attempted() - self.delivered()
    }

    pub fn failures(&self) -> impl Iterator<Item = &PostOutcome> {
        self.outcomes
            .iter()
            .filter(|outcome| !outcome.result.is_ok())
    }

    pub fn status_message(&self) -> String {
        let attempted = self.attempted();
        let failed = self.failed();
        if attempted == 0 {
            "nothing to post".to_owned()
        } else if failed == 0 {
            STATUS_ALL_POSTED.to_owned()
        } else if failed == attempted {
            format!("all {attempted} posts failed; check the log for details")
        } else {
            format!("{failed} of {attempted} posts failed; check the log for details")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReplyReport {
    pub matched_rows: Vec<RowId>,
    pub results: Vec<RequestResult>,
}

impl ReplyReport {
    pub fn sent(&self) -> usize {
        self.results.len()
    }

    pub fn delivered(&self) -> usize {
        self.results.iter().filter(|result| result.is_ok()).count()
    }

    pub fn status_message(&self) -> String {
        match (self.sent(), self.delivered()) {
            (0, _) => "no rows asked for a reply".to_owned(),
            (sent, delivered) if sent == delivered => format!("auto-replied to {sent} rows"),
            (sent, delivered) => format!(
                "auto-reply: {} of {sent} failed; check the log for details",
                sent - delivered
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppMode {
    Nav,
    Edit,
    Find,
}

#[cfg(test)]
mod tests {
    use super::{
        PostOutcome, PostReport, ReplyReport, RequestResult, Row, RowField, STATUS_ALL_POSTED,
        SortState,
    };
    use crate::RowId;

    fn outcome(ok: bool) -> PostOutcome {
        PostOutcome {
            row_id: RowId::new(1),
            account: "acme".to_owned(),
            field: RowField::ContentA,
            result: if ok {
                RequestResult::Delivered { status: 200 }
            } else {
                RequestResult::Failed {
                    error: "boom".to_owned(),
                }
            },
        }
    }

    #[test]
    fn sort_state_cycles_on_same_field_and_resets_on_new_field() {
        let state = SortState::Unsorted.next(RowField::Account);
        assert_eq!(state, SortState::Ascending(RowField::Account));

        let state = state.next(RowField::Account);
        assert_eq!(state, SortState::Descending(RowField::Account));

        let state = state.next(RowField::Account);
        assert_eq!(state, SortState::Ascending(RowField::Account));

        let state = SortState::Descending(RowField::Account).next(RowField::Label);
        assert_eq!(state, SortState::Ascending(RowField::Label));
    }

    #[test]
    fn indicator_only_marks_active_field() {
        let state = SortState::Descending(RowField::BusinessAccount);
        assert_eq!(state.indicator_for(RowField::BusinessAccount), "▼");
        assert_eq!(state.indicator_for(RowField::Account), "");
        assert_eq!(SortState::Unsorted.indicator_for(RowField::Account), "");
    }

    #[test]
    fn field_keys_round_trip() {
        for field in RowField::ALL {
            assert_eq!(RowField::parse(field.as_str()), Some(field));
        }
        assert_eq!(RowField::parse("nope"), None);
    }

    #[test]
    fn row_field_accessors_agree() {
        let mut row = Row::empty(RowId::new(3));
        *row.field_mut(RowField::ContentB) = "hello".to_owned();
        assert_eq!(row.field(RowField::ContentB), "hello");
        assert_eq!(row.content_b, "hello");
        assert_eq!(row.contents()[1], (RowField::ContentB, "hello"));
    }

    #[test]
    fn post_report_status_distinguishes_outcomes() {
        let all_ok = PostReport {
            outcomes: vec![outcome(true), outcome(true)],
        };
        assert_eq!(all_ok.status_message(), STATUS_ALL_POSTED);

        let partial = PostReport {
            outcomes: vec![outcome(true), outcome(false)],
        };
        assert_eq!(partial.failed(), 1);
        assert!(partial.status_message().contains("1 of 2 posts failed"));

        let none_ok = PostReport {
            outcomes: vec![outcome(false), outcome(false)],
        };
        assert!(none_ok.status_message().contains("all 2 posts failed"));

        assert_eq!(PostReport::default().status_message(), "nothing to post");
    }

    #[test]
    fn reply_report_status() {
        assert_eq!(
            ReplyReport::default().status_message(),
            "no rows asked for a reply"
        );
        let report = ReplyReport {
            matched_rows: vec![RowId::new(1), RowId::new(2)],
            results: vec![
                RequestResult::Delivered { status: 200 },
                RequestResult::Failed {
                    error: "down".to_owned(),
                },
            ],
        };
        assert!(report.status_message().contains("1 of 2 failed"));
    }
}
