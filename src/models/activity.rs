use std::fmt;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Content domain an item belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Numbers,
    CapitalAlphabet,
    SmallAlphabet,
    Shapes,
    Colors,
}

const SHAPES: [&str; 10] = [
    "Circle",
    "Square",
    "Triangle",
    "Rectangle",
    "Oval",
    "Diamond",
    "Star",
    "Heart",
    "Pentagon",
    "Hexagon",
];

const COLORS: [&str; 12] = [
    "Red", "Blue", "Yellow", "Green", "Orange", "Purple", "Pink", "Brown", "Black", "White",
    "Gray", "Cyan",
];

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Numbers,
        Category::CapitalAlphabet,
        Category::SmallAlphabet,
        Category::Shapes,
        Category::Colors,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Numbers => "Numbers",
            Category::CapitalAlphabet => "CapitalAlphabet",
            Category::SmallAlphabet => "SmallAlphabet",
            Category::Shapes => "Shapes",
            Category::Colors => "Colors",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Category::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(value.trim()))
    }

    /// Items the app teaches in this category.
    pub fn expected_items(self) -> Vec<String> {
        match self {
            Category::Numbers => (1..=10).map(|n| n.to_string()).collect(),
            Category::CapitalAlphabet => ('A'..='Z').map(|c| c.to_string()).collect(),
            Category::SmallAlphabet => ('a'..='z').map(|c| c.to_string()).collect(),
            Category::Shapes => SHAPES.iter().map(|s| s.to_string()).collect(),
            Category::Colors => COLORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn expected_item_count(self) -> usize {
        match self {
            Category::Numbers => 10,
            Category::CapitalAlphabet | Category::SmallAlphabet => 26,
            Category::Shapes => SHAPES.len(),
            Category::Colors => COLORS.len(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quiz style reported by the app for a single quiz attempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum QuizType {
    ObjectRecognition,
    Listening,
    TextToFigure,
    FigureToText,
    Counting,
    BubblePop,
}

impl QuizType {
    pub const ALL: [QuizType; 6] = [
        QuizType::ObjectRecognition,
        QuizType::Listening,
        QuizType::TextToFigure,
        QuizType::FigureToText,
        QuizType::Counting,
        QuizType::BubblePop,
    ];

    pub fn activity(self) -> ActivityKind {
        match self {
            QuizType::ObjectRecognition => ActivityKind::ObjectRecognition,
            QuizType::Listening => ActivityKind::Listening,
            QuizType::TextToFigure => ActivityKind::TextToFigure,
            QuizType::FigureToText => ActivityKind::FigureToText,
            QuizType::Counting => ActivityKind::Counting,
            QuizType::BubblePop => ActivityKind::BubblePop,
        }
    }
}

/// The seven activity labels used for ranking. Declaration order is the
/// tie-break order for "weakest activity".
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ActivityKind {
    Tracing,
    ObjectRecognition,
    #[serde(alias = "Hearing")]
    Listening,
    TextToFigure,
    FigureToText,
    Counting,
    BubblePop,
}

impl ActivityKind {
    pub const ALL: [ActivityKind; 7] = [
        ActivityKind::Tracing,
        ActivityKind::ObjectRecognition,
        ActivityKind::Listening,
        ActivityKind::TextToFigure,
        ActivityKind::FigureToText,
        ActivityKind::Counting,
        ActivityKind::BubblePop,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActivityKind::Tracing => "Tracing",
            ActivityKind::ObjectRecognition => "ObjectRecognition",
            ActivityKind::Listening => "Listening",
            ActivityKind::TextToFigure => "TextToFigure",
            ActivityKind::FigureToText => "FigureToText",
            ActivityKind::Counting => "Counting",
            ActivityKind::BubblePop => "BubblePop",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ActivityKind::Tracing => "Tracing",
            ActivityKind::ObjectRecognition => "Object Recognition",
            ActivityKind::Listening => "Listening",
            ActivityKind::TextToFigure => "Text to Figure",
            ActivityKind::FigureToText => "Figure to Text",
            ActivityKind::Counting => "Counting",
            ActivityKind::BubblePop => "Bubble Pop",
        }
    }

    /// The quiz type feeding this label, `None` for tracing.
    pub fn quiz_type(self) -> Option<QuizType> {
        match self {
            ActivityKind::Tracing => None,
            ActivityKind::ObjectRecognition => Some(QuizType::ObjectRecognition),
            ActivityKind::Listening => Some(QuizType::Listening),
            ActivityKind::TextToFigure => Some(QuizType::TextToFigure),
            ActivityKind::FigureToText => Some(QuizType::FigureToText),
            ActivityKind::Counting => Some(QuizType::Counting),
            ActivityKind::BubblePop => Some(QuizType::BubblePop),
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PeriodType {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl PeriodType {
    pub fn as_str(self) -> &'static str {
        match self {
            PeriodType::Daily => "Daily",
            PeriodType::Weekly => "Weekly",
            PeriodType::Monthly => "Monthly",
            PeriodType::Yearly => "Yearly",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Daily" => Some(PeriodType::Daily),
            "Weekly" => Some(PeriodType::Weekly),
            "Monthly" => Some(PeriodType::Monthly),
            "Yearly" => Some(PeriodType::Yearly),
            _ => None,
        }
    }

    /// First day of the period containing `date`. Weeks start on Monday.
    pub fn period_start(self, date: NaiveDate) -> NaiveDate {
        match self {
            PeriodType::Daily => date,
            PeriodType::Weekly => {
                date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
            }
            PeriodType::Monthly => date.with_day(1).unwrap_or(date),
            PeriodType::Yearly => NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date),
        }
    }
}

impl fmt::Display for PeriodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
