//! Roles and the instructor access gate.
//!
//! The gate is a plain predicate. Whatever shell exposes the instructor
//! dashboard must call `AccessGate::authorize` first.

use serde::{Deserialize, Serialize};

/// The seven student departments of the classroom exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Department {
    BusinessProcurement,
    It,
    Operations,
    Legal,
    HrTraining,
    TransformationOffice,
    CorpCommunications,
}

impl Department {
    pub const ALL: [Department; 7] = [
        Self::BusinessProcurement,
        Self::It,
        Self::Operations,
        Self::Legal,
        Self::HrTraining,
        Self::TransformationOffice,
        Self::CorpCommunications,
    ];

    pub fn number(&self) -> u8 {
        match self {
            Self::BusinessProcurement  => 1,
            Self::It                   => 2,
            Self::Operations           => 3,
            Self::Legal                => 4,
            Self::HrTraining           => 5,
            Self::TransformationOffice => 6,
            Self::CorpCommunications   => 7,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::BusinessProcurement  => "Business & Procurement",
            Self::It                   => "IT",
            Self::Operations           => "Operations",
            Self::Legal                => "Legal",
            Self::HrTraining           => "HR & Training",
            Self::TransformationOffice => "Transformation Office",
            Self::CorpCommunications   => "Corp Communications",
        }
    }

    /// Selector label, e.g. "Team 2: IT".
    pub fn label(&self) -> String {
        format!("Team {}: {}", self.number(), self.name())
    }

    pub fn mission(&self) -> &'static str {
        match self {
            Self::BusinessProcurement  => "Allocate the 1M PLN budget and decide on the vendor strategy.",
            Self::It                   => "Ensure software readiness and integration with legacy POS.",
            Self::Operations           => "Manage physical installation in 2000 stores.",
            Self::Legal                => "Manage GDPR and Accessibility Law X compliance.",
            Self::HrTraining           => "Manage workforce transition and 30% resistance rate.",
            Self::TransformationOffice => "Risk Management and Contingency Planning.",
            Self::CorpCommunications   => "Manage Internal and External messaging.",
        }
    }

    /// The change-management concept debriefed after submission. IT gets
    /// none: its decisions are purely technical.
    pub fn insight(&self) -> Option<&'static str> {
        match self {
            Self::BusinessProcurement | Self::Operations => Some(
                "Lewin's Force Field Analysis: you are weighing the driving forces \
                 (efficiency, ROI) against the restraining forces (cost, complexity).",
            ),
            Self::HrTraining | Self::CorpCommunications => Some(
                "ADKAR Model (Awareness/Desire): your decisions drive the people side \
                 of change. Cheap training fails to build Ability.",
            ),
            Self::Legal | Self::TransformationOffice => Some(
                "Kotter's Risk Analysis: ignoring barriers such as accessibility allows \
                 complacency, which can derail the refreezing stage.",
            ),
            Self::It => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", content = "department", rename_all = "snake_case")]
pub enum Role {
    Instructor,
    Team(Department),
}

impl Role {
    pub const INSTRUCTOR_LABEL: &'static str = "Professor (Master View)";

    /// Parse a selector label. Accepts "Professor (Master View)",
    /// "instructor", "Team 2: IT", "Team 2", or a department name.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.eq_ignore_ascii_case(Self::INSTRUCTOR_LABEL)
            || input.eq_ignore_ascii_case("instructor")
            || input.eq_ignore_ascii_case("professor")
        {
            return Some(Self::Instructor);
        }

        let head = input.split(':').next().unwrap_or_default().trim();
        if let Some(number) = head
            .strip_prefix("Team ")
            .and_then(|n| n.trim().parse::<u8>().ok())
        {
            return Department::ALL
                .into_iter()
                .find(|d| d.number() == number)
                .map(Self::Team);
        }

        Department::ALL
            .into_iter()
            .find(|d| d.name().eq_ignore_ascii_case(input))
            .map(Self::Team)
    }

    pub fn label(&self) -> String {
        match self {
            Self::Instructor => Self::INSTRUCTOR_LABEL.to_string(),
            Self::Team(d) => d.label(),
        }
    }

    pub fn department(&self) -> Option<Department> {
        match self {
            Self::Instructor => None,
            Self::Team(d) => Some(*d),
        }
    }
}

/// Shared-secret check for the instructor role.
#[derive(Debug, Clone)]
pub struct AccessGate {
    secret: String,
}

impl AccessGate {
    pub fn new(secret: impl Into<String>) -> Self {
        Self { secret: secret.into() }
    }

    /// Teams always pass. The instructor passes only with the secret.
    pub fn authorize(&self, role: Role, password: Option<&str>) -> bool {
        match role {
            Role::Team(_) => true,
            Role::Instructor => {
                let granted = password.is_some_and(|p| constant_time_eq(p, &self.secret));
                if !granted {
                    log::warn!("instructor access denied");
                }
                granted
            }
        }
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
