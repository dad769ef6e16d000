use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::error::ImportError;
use crate::sheet::Cell;

pub mod field {
    pub const ID: &str = "id";
    pub const START_TIME: &str = "startTime";
    pub const ROLE: &str = "role";
    pub const UNIVERSITY: &str = "university";
    pub const PLANNING: &str = "planning";
    pub const LOCAL_STAFF: &str = "localStaff";
    pub const SENDING_INSTITUTION: &str = "sendingInstitution";
    pub const ACCOMMODATION_TRAVEL: &str = "accommodationTravel";
    pub const PROGRAMME: &str = "programme";
    pub const CULTURAL_TOUR: &str = "culturalTour";
    pub const OVERALL_SATISFACTION: &str = "overallSatisfaction";
    pub const PREPAREDNESS: &str = "preparedness";
    pub const COMMENTS: &str = "comments";
    pub const MEMORABLE_MOMENT: &str = "memorableMoment";
    pub const PROGRAM: &str = "program";
    pub const IMPACT: &str = "impact";
    pub const DIGITAL_TRANSFORMATION: &str = "digitalTransformation";
    pub const CLARITY: &str = "clarity";
    pub const DATE: &str = "date";
}

static START_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(start|completion).*time|hora.*in[ií]cio").expect("valid start time regex")
});

static PROPOSAL_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"hora.*(in[ií]cio|conclus[aã]o|modifica[cç][aã]o)|(start|completion).*time")
        .expect("valid proposal date regex")
});

#[derive(Debug, Clone, Copy)]
pub enum KeywordRule {
    None,
    Any(&'static [&'static str]),
    All(&'static [&'static str]),
    Pattern(&'static LazyLock<Regex>),
}

impl KeywordRule {
    pub fn matches(&self, header: &str) -> bool {
        match self {
            KeywordRule::None => false,
            KeywordRule::Any(words) => words.iter().any(|w| header.contains(w)),
            KeywordRule::All(words) => words.iter().all(|w| header.contains(w)),
            KeywordRule::Pattern(re) => re.is_match(header),
        }
    }

    fn describe(&self) -> Option<String> {
        match self {
            KeywordRule::None => None,
            KeywordRule::Any(words) => Some(words.join(" or ")),
            KeywordRule::All(words) => Some(words.join(" & ")),
            KeywordRule::Pattern(re) => Some(format!("/{}/", re.as_str())),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub keywords: KeywordRule,
    pub required: bool,
}

impl FieldSpec {
    pub fn tried(&self) -> Vec<String> {
        let mut tried: Vec<String> = self.aliases.iter().map(|a| a.to_string()).collect();
        if let Some(keywords) = self.keywords.describe() {
            tried.push(keywords);
        }
        tried
    }
}

/// Lower-cased, trimmed header text to column position. The first of duplicate headers wins.
#[derive(Debug, Clone, Default)]
pub struct HeaderIndex {
    ordered: Vec<(String, usize)>,
    by_text: HashMap<String, usize>,
}

impl HeaderIndex {
    pub fn from_row(row: &[Cell]) -> HeaderIndex {
        let mut index = HeaderIndex::default();
        for (column, cell) in row.iter().enumerate() {
            let text = cell.text().to_lowercase();
            if text.is_empty() || index.by_text.contains_key(&text) {
                continue;
            }
            index.by_text.insert(text.clone(), column);
            index.ordered.push((text, column));
        }
        index
    }

    pub fn headers(&self) -> Vec<String> {
        self.ordered.iter().map(|(text, _)| text.clone()).collect()
    }

    pub fn exact(&self, alias: &str) -> Option<usize> {
        self.by_text.get(&alias.trim().to_lowercase()).copied()
    }

    pub fn scan(&self, rule: &KeywordRule) -> Option<usize> {
        self.ordered
            .iter()
            .find(|(text, _)| rule.matches(text))
            .map(|(_, column)| *column)
    }

    pub fn resolve(&self, spec: &FieldSpec) -> Option<usize> {
        spec.aliases
            .iter()
            .find_map(|alias| self.exact(alias))
            .or_else(|| self.scan(&spec.keywords))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResolvedColumns {
    columns: HashMap<&'static str, usize>,
}

static EMPTY_CELL: Cell = Cell::Empty;

impl ResolvedColumns {
    pub fn get(&self, name: &str) -> Option<usize> {
        self.columns.get(name).copied()
    }

    pub fn cell<'r>(&self, name: &str, row: &'r [Cell]) -> &'r Cell {
        self.get(name)
            .and_then(|column| row.get(column))
            .unwrap_or(&EMPTY_CELL)
    }

    pub fn text(&self, name: &str, row: &[Cell]) -> String {
        self.cell(name, row).text()
    }
}

pub fn resolve_columns(
    index: &HeaderIndex,
    specs: &[FieldSpec],
) -> Result<ResolvedColumns, ImportError> {
    let mut resolved = ResolvedColumns::default();
    for spec in specs {
        match index.resolve(spec) {
            Some(column) => {
                debug!("header '{}' -> column {}", spec.name, column + 1);
                resolved.columns.insert(spec.name, column);
            }
            None if spec.required => {
                return Err(ImportError::MissingColumn {
                    field: spec.name,
                    tried: spec.tried(),
                    available: index.headers(),
                });
            }
            None => debug!("optional header '{}' not present", spec.name),
        }
    }
    Ok(resolved)
}

pub static EVALUATION_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: field::ID,
        aliases: &["id"],
        keywords: KeywordRule::None,
        required: false,
    },
    FieldSpec {
        name: field::START_TIME,
        aliases: &[
            "start time",
            "start time (for filtering)",
            "hora de início",
            "hora de inicio",
        ],
        keywords: KeywordRule::Pattern(&START_TIME_RE),
        required: true,
    },
    FieldSpec {
        name: field::ROLE,
        aliases: &["you are a", "role"],
        keywords: KeywordRule::None,
        required: true,
    },
    FieldSpec {
        name: field::UNIVERSITY,
        aliases: &["your university", "university"],
        keywords: KeywordRule::None,
        required: true,
    },
    FieldSpec {
        name: field::PLANNING,
        aliases: &[
            "2 (the planning of the event)",
            "'2 (the planning of the event)",
            "2 (the planing of the event)",
            "'2 (the planing of the event)",
            "2",
            "'2",
        ],
        keywords: KeywordRule::Any(&["planning", "planing"]),
        required: true,
    },
    FieldSpec {
        name: field::LOCAL_STAFF,
        aliases: &[
            "3 (the help from staff)",
            "'3 (the help from staff)",
            "3 (the help from the local staff)",
            "'3 (the help from the local staff)",
            "3",
            "'3",
        ],
        keywords: KeywordRule::All(&["help", "staff"]),
        required: true,
    },
    FieldSpec {
        name: field::SENDING_INSTITUTION,
        aliases: &[
            "4 (the help from university)",
            "'4 (the help from university)",
            "4 (the help from your sending institution)",
            "'4 (the help from your sending institution)",
            "4",
            "'4",
        ],
        keywords: KeywordRule::Any(&["sending institution", "help from university"]),
        required: true,
    },
    FieldSpec {
        name: field::ACCOMMODATION_TRAVEL,
        aliases: &[
            "5 (accommodation and travelling)",
            "'5 (accommodation and travelling)",
            "5 (accomodation and traveling)",
            "'5 (accomodation and traveling)",
            "5",
            "'5",
        ],
        keywords: KeywordRule::Any(&["accommodation", "accomodation"]),
        required: true,
    },
    FieldSpec {
        name: field::PROGRAMME,
        aliases: &[
            "6 (the egalitarian programme)",
            "'6 (the egalitarian programme)",
            "6",
            "'6",
        ],
        keywords: KeywordRule::Any(&["programme"]),
        required: true,
    },
    FieldSpec {
        name: field::CULTURAL_TOUR,
        aliases: &["7 (the cultural tour)", "'7 (the cultural tour)", "7", "'7"],
        keywords: KeywordRule::Any(&["cultural tour"]),
        required: false,
    },
    FieldSpec {
        name: field::OVERALL_SATISFACTION,
        aliases: &[
            "8 (overall satisfaction)",
            "'8 (overall satisfaction)",
            "8 (overral satisfaction)",
            "'8 (overral satisfaction)",
            "'7 (overral satisfaction)",
            "8",
            "'8",
        ],
        keywords: KeywordRule::All(&["overall", "satisfaction"]),
        required: true,
    },
    FieldSpec {
        name: field::PREPAREDNESS,
        aliases: &[
            "9 (how preppared are you feeling)",
            "'9 (how preppared are you feeling)",
            "'8 (how preppared are you feeling)",
            "9 (how prepared are you feeling)",
            "9",
            "'9",
        ],
        keywords: KeywordRule::Any(&["prepared", "preppared"]),
        required: true,
    },
    FieldSpec {
        name: field::COMMENTS,
        aliases: &[
            "add coments bellow",
            "comments",
            "add comments below to help us understand what you liked and what we can improve in the egalitarian event (optional)",
        ],
        keywords: KeywordRule::Any(&["comment"]),
        required: true,
    },
    FieldSpec {
        name: field::MEMORABLE_MOMENT,
        aliases: &[
            "please share with us what was the most memorable moment on the event this week in your opinion (we will share this on our social media anonimously, unless you want us to share your names as well)",
        ],
        keywords: KeywordRule::Any(&["memorable"]),
        required: false,
    },
];

pub static PROPOSAL_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: field::ID,
        aliases: &["id"],
        keywords: KeywordRule::Any(&["id"]),
        required: true,
    },
    FieldSpec {
        name: field::PROGRAM,
        aliases: &["program"],
        keywords: KeywordRule::Any(&["program"]),
        required: true,
    },
    FieldSpec {
        name: field::IMPACT,
        aliases: &[
            "does the proposal intends to create the  expected  impact? (note: a framework of good practices to solve major environmental and social issues related to waste, dumpsites and waste pickers, throug...)",
            "does the proposal intends to create the expected impact?",
            "impact",
        ],
        keywords: KeywordRule::Any(&["impact"]),
        required: true,
    },
    FieldSpec {
        name: field::DIGITAL_TRANSFORMATION,
        aliases: &[
            "does the proposal intends to create digital solutions to the problems and promote digital transformation in the regions targeted, and, simultaneously, develop digital competences in the students?",
            "digital transformation",
            "digital",
        ],
        keywords: KeywordRule::Any(&["digital"]),
        required: true,
    },
    FieldSpec {
        name: field::CLARITY,
        aliases: &[
            "does the proposal is clear and detailed in terms of objectives, timeline,  organization, future work plan among others?",
            "clarity",
            "clear and detailed",
        ],
        keywords: KeywordRule::All(&["clear", "detailed"]),
        required: true,
    },
    FieldSpec {
        name: field::COMMENTS,
        aliases: &["comments and recommendations for the team progress.", "comments"],
        keywords: KeywordRule::Any(&["comments"]),
        required: true,
    },
    FieldSpec {
        name: field::DATE,
        aliases: &[
            "start time",
            "completion time",
            "hora de início",
            "hora de inicio",
            "hora da última modificação",
            "hora da última modif",
            "hora de conclusão",
            "hora de conclusao",
        ],
        keywords: KeywordRule::Pattern(&PROPOSAL_DATE_RE),
        required: true,
    },
];
