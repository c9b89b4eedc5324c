use std::fmt;

use serde::{Deserialize, Serialize};

/// The five Gherkin step keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Keyword {
    Given,
    When,
    Then,
    And,
    But,
}

impl Keyword {
    pub const ALL: [Keyword; 5] = [Keyword::Given, Keyword::When, Keyword::Then, Keyword::And, Keyword::But];

    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Given => "Given",
            Keyword::When => "When",
            Keyword::Then => "Then",
            Keyword::And => "And",
            Keyword::But => "But",
        }
    }

    /// Parse an English or Spanish keyword token (case-sensitive, as Gherkin is).
    pub fn parse(token: &str) -> Option<Keyword> {
        match token {
            "Given" | "Dado" | "Dada" | "Dados" | "Dadas" => Some(Keyword::Given),
            "When" | "Cuando" => Some(Keyword::When),
            "Then" | "Entonces" => Some(Keyword::Then),
            "And" | "Y" | "E" => Some(Keyword::And),
            "But" | "Pero" => Some(Keyword::But),
            _ => None,
        }
    }

    /// Whether step definitions may be registered under this keyword.
    pub fn is_registrable(&self) -> bool {
        matches!(self, Keyword::Given | Keyword::When | Keyword::Then)
    }

    /// Split a line into its leading English keyword and the rest.
    pub fn split_step_line(line: &str) -> Option<(Keyword, &str)> {
        let trimmed = line.trim_start();
        let (token, rest) = trimmed.split_once(char::is_whitespace)?;
        Keyword::ALL
            .iter()
            .find(|k| k.as_str() == token)
            .map(|k| (*k, rest.trim()))
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a classified instruction does. Only these can back a step definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StepKind {
    /// Given
    Precondition,
    /// When
    Action,
    /// Then
    Assertion,
}

impl StepKind {
    pub fn keyword(&self) -> Keyword {
        match self {
            StepKind::Precondition => Keyword::Given,
            StepKind::Action => Keyword::When,
            StepKind::Assertion => Keyword::Then,
        }
    }

    pub fn from_keyword(keyword: Keyword) -> Option<StepKind> {
        match keyword {
            Keyword::Given => Some(StepKind::Precondition),
            Keyword::When => Some(StepKind::Action),
            Keyword::Then => Some(StepKind::Assertion),
            Keyword::And | Keyword::But => None,
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword().as_str())
    }
}
