//! Resource DTOs for the scenario console API.
//!
//! # Design
//! Field names follow the backend's camelCase JSON. Almost every field is
//! optional because the same shape is used for create, update and read,
//! and the backend fills joined columns (`agentName`, `stepCount`, ...)
//! only on read. Integer flags (`isActive`, `isDefault`, ...) stay `i32`
//! on the wire; `isActive` additionally accepts a JSON boolean.

use serde::{Deserialize, Deserializer, Serialize};

/// A teaching/conversation scenario bound to an agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario_code: Option<String>,
    #[serde(default)]
    pub scenario_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_keywords: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_cards: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty_level: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_age: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i32>,
    #[serde(
        default,
        rename = "isActive",
        deserialize_with = "flag_from_bool_or_int",
        skip_serializing_if = "Option::is_none"
    )]
    pub is_active: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_default_teaching: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teaching_mode_config: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_switch_to_free: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub praise_messages: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encouragement_messages: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_count: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
}

/// One step of a scenario's dialogue flow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioStep {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_code: Option<String>,
    #[serde(default)]
    pub step_name: String,
    #[serde(default)]
    pub step_order: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_keywords: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_phrases: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_step_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_step_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub praise_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encouragement_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_reply_on_timeout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_time_seconds: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gesture_hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub music_effect: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_optional: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_condition: Option<String>,
}

/// A reusable step template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepTemplate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_code: Option<String>,
    #[serde(default)]
    pub template_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_keywords: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_phrases: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speech_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_default: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i32>,
}

/// A child's learning session within a scenario.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_steps: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_steps: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_rate: Option<f64>,
    /// Seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learning_duration: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty_rating: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learning_duration_formatted: Option<String>,
}

/// One page of a paged list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageData<T> {
    pub total: u64,
    #[serde(default)]
    pub list: Vec<T>,
}

/// Paging and filter parameters for list endpoints, sent as a query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub filters: Vec<(String, String)>,
}

impl ListParams {
    pub fn page(page: u32, limit: u32) -> Self {
        Self {
            page: Some(page),
            limit: Some(limit),
            filters: Vec::new(),
        }
    }

    pub fn filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((key.into(), value.into()));
        self
    }

    pub(crate) fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::with_capacity(self.filters.len() + 2);
        if let Some(page) = self.page {
            query.push(("page".to_string(), page.to_string()));
        }
        if let Some(limit) = self.limit {
            query.push(("limit".to_string(), limit.to_string()));
        }
        query.extend(self.filters.iter().cloned());
        query
    }
}

/// Body of `PUT /scenario/{id}/toggle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleScenario {
    #[serde(rename = "isActive", deserialize_with = "int_from_bool_or_int")]
    pub is_active: i32,
}

impl ToggleScenario {
    pub fn new(active: bool) -> Self {
        Self {
            is_active: i32::from(active),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BoolOrInt {
    Bool(bool),
    Int(i64),
}

impl From<BoolOrInt> for i32 {
    fn from(v: BoolOrInt) -> Self {
        match v {
            BoolOrInt::Bool(b) => i32::from(b),
            BoolOrInt::Int(n) => i32::from(n != 0),
        }
    }
}

fn flag_from_bool_or_int<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<BoolOrInt>::deserialize(deserializer)?.map(i32::from))
}

fn int_from_bool_or_int<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    BoolOrInt::deserialize(deserializer).map(i32::from)
}
