//! Customer- and order-level analytics over the preprocessed table.

pub mod customer;
pub mod order;
pub mod stats;

use serde::{Deserialize, Serialize};

/// Analysis pipelines persisted per program. Integer values are stable and
/// stored in `analysis_results.analysis_type`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    Customer,
    Order,
}

impl AnalysisType {
    pub const ALL: [AnalysisType; 2] = [AnalysisType::Customer, AnalysisType::Order];

    pub fn id(self) -> i64 {
        match self {
            Self::Customer => 1,
            Self::Order => 2,
        }
    }

    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(Self::Customer),
            2 => Some(Self::Order),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Order => "order",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AnalysisType;

    #[test]
    fn ids_round_trip() {
        for analysis_type in AnalysisType::ALL {
            assert_eq!(AnalysisType::from_id(analysis_type.id()), Some(analysis_type));
        }
        assert_eq!(AnalysisType::from_id(99), None);
    }
}
