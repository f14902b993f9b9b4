//! The built-in offer template registry.
//!
//! Each template pairs an output schema with a generation category and the
//! marketing goals it serves. Offer generation fans out over every template
//! here; adding a template to the registry is all it takes to include it in
//! a run.

use thiserror::Error;

/// Marketing goal an offer campaign targets. Ids are stable and persisted
/// alongside generated offers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Goal {
    IncreaseAov,
    RepeatCustomers,
    IncreaseOccupancy,
}

impl Goal {
    pub const ALL: [Goal; 3] = [Goal::IncreaseAov, Goal::RepeatCustomers, Goal::IncreaseOccupancy];

    pub fn id(self) -> i64 {
        match self {
            Goal::IncreaseAov => 1,
            Goal::RepeatCustomers => 2,
            Goal::IncreaseOccupancy => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Goal::IncreaseAov => "Increase Average Order Value",
            Goal::RepeatCustomers => "Increase Repeat Customers",
            Goal::IncreaseOccupancy => "Increase Occupancy",
        }
    }

    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(Goal::IncreaseAov),
            2 => Some(Goal::RepeatCustomers),
            3 => Some(Goal::IncreaseOccupancy),
            _ => None,
        }
    }
}

/// Stable template identifiers. Ids are persisted with generated offers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TemplateKey {
    BasicDiscountCoupon,
    BasicDiscountStandard,
    WinbackMissYou,
    VisitMilestoneFirstVisit,
    VisitMilestoneVisitBased,
    StampCardLoyalty,
    HappyHoursTimeBased,
    ComboOfferStandard,
}

impl TemplateKey {
    pub const ALL: [TemplateKey; 8] = [
        TemplateKey::BasicDiscountCoupon,
        TemplateKey::BasicDiscountStandard,
        TemplateKey::WinbackMissYou,
        TemplateKey::VisitMilestoneFirstVisit,
        TemplateKey::VisitMilestoneVisitBased,
        TemplateKey::StampCardLoyalty,
        TemplateKey::HappyHoursTimeBased,
        TemplateKey::ComboOfferStandard,
    ];

    pub fn id(self) -> i64 {
        match self {
            TemplateKey::BasicDiscountCoupon => 1,
            TemplateKey::BasicDiscountStandard => 2,
            TemplateKey::WinbackMissYou => 3,
            TemplateKey::VisitMilestoneFirstVisit => 4,
            TemplateKey::VisitMilestoneVisitBased => 5,
            TemplateKey::StampCardLoyalty => 6,
            TemplateKey::HappyHoursTimeBased => 7,
            TemplateKey::ComboOfferStandard => 8,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TemplateKey::BasicDiscountCoupon => "BASIC_DISCOUNT_COUPON",
            TemplateKey::BasicDiscountStandard => "BASIC_DISCOUNT_STANDARD",
            TemplateKey::WinbackMissYou => "WINBACK_MISS_YOU",
            TemplateKey::VisitMilestoneFirstVisit => "VISIT_MILESTONE_FIRST_VISIT",
            TemplateKey::VisitMilestoneVisitBased => "VISIT_MILESTONE_VISIT_BASED",
            TemplateKey::StampCardLoyalty => "STAMP_CARD_LOYALTY",
            TemplateKey::HappyHoursTimeBased => "HAPPY_HOURS_TIME_BASED",
            TemplateKey::ComboOfferStandard => "COMBO_OFFER_STANDARD",
        }
    }

    pub fn from_id(id: i64) -> Option<Self> {
        TemplateKey::ALL.into_iter().find(|key| key.id() == id)
    }
}

/// Prompt/output family a template generates under. Distinct categories let
/// the generation client tailor output shape per family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GenerationCategory {
    Coupon,
    Standard,
    MissYou,
    FirstVisit,
    VisitBased,
    Loyalty,
    TimeBased,
    Forecast,
}

/// Output schema a template's generated offers must conform to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TemplateSchema {
    BasicCoupon,
    StandardCoupon,
    MissYou,
    FirstVisit,
    VisitBased,
    StampCard,
    HappyHours,
    ComboOffer,
    Forecast,
}

#[derive(Clone, Debug)]
pub struct TemplateConfig {
    pub key: TemplateKey,
    pub schema: TemplateSchema,
    pub category: GenerationCategory,
    pub goals: Vec<Goal>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("template {0} registered twice")]
    DuplicateTemplate(&'static str),
    #[error("template {0} has no goals")]
    NoGoals(&'static str),
    #[error("template {0} lists goal {1} twice")]
    DuplicateGoal(&'static str, &'static str),
}

/// All templates offer generation runs over.
#[derive(Debug)]
pub struct TemplateRegistry {
    templates: Vec<TemplateConfig>,
}

impl TemplateRegistry {
    /// Builds the built-in registry, validating goal lists.
    pub fn builtin() -> Result<Self, RegistryError> {
        Self::from_templates(vec![
            TemplateConfig {
                key: TemplateKey::BasicDiscountCoupon,
                schema: TemplateSchema::BasicCoupon,
                category: GenerationCategory::Coupon,
                goals: vec![Goal::IncreaseAov, Goal::IncreaseOccupancy],
            },
            TemplateConfig {
                key: TemplateKey::BasicDiscountStandard,
                schema: TemplateSchema::StandardCoupon,
                category: GenerationCategory::Standard,
                goals: vec![Goal::IncreaseAov, Goal::IncreaseOccupancy],
            },
            TemplateConfig {
                key: TemplateKey::WinbackMissYou,
                schema: TemplateSchema::MissYou,
                category: GenerationCategory::MissYou,
                goals: vec![Goal::RepeatCustomers],
            },
            TemplateConfig {
                key: TemplateKey::VisitMilestoneFirstVisit,
                schema: TemplateSchema::FirstVisit,
                category: GenerationCategory::FirstVisit,
                goals: vec![Goal::IncreaseOccupancy],
            },
            TemplateConfig {
                key: TemplateKey::VisitMilestoneVisitBased,
                schema: TemplateSchema::VisitBased,
                category: GenerationCategory::VisitBased,
                goals: vec![Goal::RepeatCustomers],
            },
            TemplateConfig {
                key: TemplateKey::StampCardLoyalty,
                schema: TemplateSchema::StampCard,
                category: GenerationCategory::Loyalty,
                goals: vec![Goal::RepeatCustomers],
            },
            TemplateConfig {
                key: TemplateKey::HappyHoursTimeBased,
                schema: TemplateSchema::HappyHours,
                category: GenerationCategory::TimeBased,
                goals: vec![Goal::IncreaseOccupancy],
            },
            TemplateConfig {
                key: TemplateKey::ComboOfferStandard,
                schema: TemplateSchema::ComboOffer,
                category: GenerationCategory::Standard,
                goals: vec![Goal::IncreaseAov],
            },
        ])
    }

    fn from_templates(templates: Vec<TemplateConfig>) -> Result<Self, RegistryError> {
        for (position, template) in templates.iter().enumerate() {
            if templates[..position].iter().any(|other| other.key == template.key) {
                return Err(RegistryError::DuplicateTemplate(template.key.as_str()));
            }
            if template.goals.is_empty() {
                return Err(RegistryError::NoGoals(template.key.as_str()));
            }
            for (i, goal) in template.goals.iter().enumerate() {
                if template.goals[..i].contains(goal) {
                    return Err(RegistryError::DuplicateGoal(template.key.as_str(), goal.name()));
                }
            }
        }
        Ok(Self { templates })
    }

    pub fn get(&self, key: TemplateKey) -> Option<&TemplateConfig> {
        self.templates.iter().find(|template| template.key == key)
    }

    pub fn by_id(&self, id: i64) -> Option<&TemplateConfig> {
        self.templates.iter().find(|template| template.key.id() == id)
    }

    pub fn templates_for_goal(&self, goal: Goal) -> Vec<&TemplateConfig> {
        self.templates.iter().filter(|template| template.goals.contains(&goal)).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TemplateConfig> {
        self.templates.iter()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
