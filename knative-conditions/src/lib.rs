use serde::{Serialize, Deserialize};
use schemars::JsonSchema;
use std::fmt::Debug;

/// Defines how the variants of a [`ConditionType`]
/// depend on one another.
struct ConditionSet<C: ConditionType> {
    happy: C,
    dependents: &'static [C],
}

impl<C> ConditionSet<C>
where C: ConditionType {
    fn new() -> Self {
        assert!(
            !C::dependents().contains(&C::happy()),
            "dependents may not contain happy condition"
        );

        ConditionSet {
            happy: C::happy(),
            dependents: C::dependents()
        }
    }

    /// Whether the [`ConditionType`] determines happiness.
    pub fn is_terminal(&self, condition_type: &C) -> bool {
        self.dependents.contains(condition_type) || self.happy == *condition_type
    }

    pub fn severity(&self, condition_type: &C) -> ConditionSeverity {
        if self.is_terminal(condition_type) {
            ConditionSeverity::Error
        } else {
            ConditionSeverity::Info
        }
    }
}

/// Enums that implement [`ConditionType`] can be used to differentiate [`Condition`]
/// and describe the state of the resource.
///
/// Usually derived with `knative_derive::ConditionType`.
pub trait ConditionType: Clone + Copy + Default + Debug + PartialEq + 'static {
    /// The top-level variant that determines overall readiness of the resource.
    fn happy() -> Self;
    /// Variants that must be true to consider the happy condition true.
    fn dependents() -> &'static [Self];
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, JsonSchema, PartialEq)]
#[non_exhaustive]
/// The importance of a conditions status.
pub enum ConditionSeverity {
    Error,
    Warning,
    Info,
}

impl ConditionSeverity {
    pub fn is_err(&self) -> bool {
        *self == ConditionSeverity::Error
    }
}

impl Default for ConditionSeverity {
    fn default() -> Self {
        ConditionSeverity::Error
    }
}

/// A [`Vec`] of [`Condition`] that maintains transition times.
#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, PartialEq)]
pub struct Conditions<C>(Vec<Condition<C>>)
    where C: ConditionType;

impl<C> Default for Conditions<C>
where C: ConditionType {
    fn default() -> Self {
        let iter = [C::happy()]
            .into_iter()
            .chain(C::dependents().iter().copied())
            .map(Condition::new);
        Conditions(Vec::from_iter(iter))
    }
}

impl<C: ConditionType> Conditions<C> {
    pub fn with_conditions(conditions: Vec<Condition<C>>) -> Conditions<C> {
        assert!(
            conditions.iter().any(|c| c.type_ == C::happy()),
            "Conditions must be initialized with the happy ConditionType"
        );
        Conditions(conditions)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Condition<C>> {
        self.0.iter()
    }

    pub fn get(&self, type_: C) -> Option<&Condition<C>> {
        self.get_cond(&type_)
    }

    fn get_cond(&self, type_: &C) -> Option<&Condition<C>> {
        self.0.iter().find(|c| c.type_ == *type_)
    }

    fn get_cond_mut(&mut self, type_: &C) -> Option<&mut Condition<C>> {
        self.0.iter_mut().find(|c| c.type_ == *type_)
    }

    fn set_cond(&mut self, mut condition: Condition<C>) {
        match self.get_cond_mut(&condition.type_) {
            Some(cond) => {
                // Check if only the time has changed
                let test_cond = Condition {
                    last_transition_time: condition.last_transition_time,
                    ..cond.clone()
                };
                if test_cond == condition {
                    return
                } else {
                    *cond = Condition {
                        last_transition_time: Some(chrono::Utc::now()),
                        ..condition
                    }
                }
            }
            None => {
                condition.last_transition_time = Some(chrono::Utc::now());
                self.0.push(condition);
            }
        }
    }

    fn mark_true(&mut self, condition_type: C, severity: ConditionSeverity) {
        self.set_cond(Condition {
            type_: condition_type,
            status: ConditionStatus::True,
            severity,
            ..Default::default()
        })
    }

    fn mark_true_with_reason(&mut self, condition_type: C, severity: ConditionSeverity, reason: String, message: Option<String>) {
        self.set_cond(Condition {
            type_: condition_type,
            status: ConditionStatus::True,
            severity,
            reason: Some(reason),
            message,
            ..Default::default()
        })
    }

    fn mark_false(&mut self, condition_type: C, severity: ConditionSeverity, reason: String, message: Option<String>) {
        self.set_cond(Condition {
            type_: condition_type,
            status: ConditionStatus::False,
            severity,
            reason: Some(reason),
            message,
            ..Default::default()
        });
    }

    fn mark_unknown(&mut self, condition_type: C, severity: ConditionSeverity, reason: String, message: Option<String>) {
        self.set_cond(Condition {
            type_: condition_type,
            status: ConditionStatus::Unknown,
            severity,
            reason: Some(reason),
            message,
            ..Default::default()
        });
    }
}

/// A custom resource status condition.
#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition<C: ConditionType> {
    #[serde(rename = "type")]
    pub type_: C,
    pub status: ConditionStatus,
    /// ConditionSeverityError specifies that a failure of a condition type
    /// should be viewed as an error.  As "Error" is the default for conditions
    /// we use the empty string (coupled with omitempty) to avoid confusion in
    /// the case where the condition is in state "True" (aka nothing is wrong).
    // In rust lang we accomplish this with Error as a Default variant
    #[serde(default)]
    #[serde(skip_serializing_if = "ConditionSeverity::is_err")]
    pub severity: ConditionSeverity,
    pub last_transition_time: Option<chrono::DateTime<chrono::Utc>>,
    pub reason: Option<String>,
    pub message: Option<String>,
}

impl<C: ConditionType> Default for Condition<C> {
    fn default() -> Condition<C> {
        Condition {
            type_: C::default(),
            status: ConditionStatus::default(),
            severity: ConditionSeverity::default(),
            last_transition_time: Some(chrono::Utc::now()),
            reason: None,
            message: None
        }
    }
}

impl<C: ConditionType> PartialOrd for Condition<C> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        use ConditionStatus::*;
        use std::cmp::Ordering;

        let time_ord = match (self.last_transition_time, other.last_transition_time) {
            (Some(left), Some(right)) => left.partial_cmp(&right),
            _ => None
        };

        match (self.status, other.status) {
            (False, False) | (Unknown, Unknown) | (True, True) => match time_ord {
                Some(ord) => Some(ord),
                None => Some(Ordering::Equal)
            },
            (False, _) | (Unknown, True) => Some(Ordering::Greater),
            (Unknown, False) | (True, _) => Some(Ordering::Less),
        }
    }
}

/// The state of a [`Condition`].
#[derive(Deserialize, Serialize, Clone, Copy, Debug, JsonSchema, PartialEq)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl Default for ConditionStatus {
    fn default() -> Self {
        ConditionStatus::Unknown
    }
}

impl<C: ConditionType> Condition<C> {
    fn new(type_: C) -> Self {
        Condition {
            type_,
            ..Default::default()
        }
    }

    pub fn is_true(&self) -> bool {
        self.status == ConditionStatus::True
    }

    pub fn is_false(&self) -> bool {
        self.status == ConditionStatus::False
    }

    pub fn is_unknown(&self) -> bool {
        self.status == ConditionStatus::Unknown
    }
}

/// Provides [`ConditionManager`] access to the [`Conditions`] of a status.
pub trait ConditionAccessor<C: ConditionType> {
    /// Return the conditions of your CR status type.
    fn conditions(&mut self) -> &mut Conditions<C>;

    /// Returns a [`ConditionManager`] for more fine-grained control of [`Conditions`].
    fn manager(&mut self) -> ConditionManager<C> {
        ConditionManager::new(self.conditions())
    }

    /// Returns true if the resource is ready overall.
    fn is_ready(&mut self) -> bool {
        self.manager().is_happy()
    }
}

/// Mutates [`Conditions`] in accordance with the condition dependency chain defined by a
/// [`ConditionType`]
pub struct ConditionManager<'a, C>
where C: ConditionType {
    set: ConditionSet<C>,
    conditions: &'a mut Conditions<C>,
}

impl<'a, C> ConditionManager<'a, C>
where C: ConditionType {
    pub fn new(conditions: &'a mut Conditions<C>) -> Self {
        ConditionManager {
            set: ConditionSet::new(),
            conditions
        }
    }

    pub fn get_condition(&self, condition_type: C) -> Option<&Condition<C>> {
        self.conditions.get_cond(&condition_type)
    }

    /// Returns the happy [`Condition`].
    ///
    /// ### Panic
    /// *Panics* if the [`Conditions`] have not been properly initialized.
    /// See [`Conditions::default()`].
    pub fn get_top_level_condition(&self) -> &Condition<C> {
        self.get_condition(self.set.happy)
            .expect("top level condition is initialized")
    }

    pub fn is_happy(&self) -> bool {
        self.get_top_level_condition().is_true()
    }

    fn find_unhappy_dependent(&mut self) -> Option<&mut Condition<C>> {
        let set = &self.set;
        self.conditions.0
            .iter_mut()
            // Filter to non-true, terminal dependents
            .filter(|cond| cond.type_ != set.happy && set.is_terminal(&cond.type_) && !cond.is_true())
            // Return a condition, prioritizing most recent False over most recent Unknown
            .reduce(|unhappy, cond| if *cond > *unhappy { cond } else { unhappy })
    }

    /// Mark the happy condition to true if all other dependents are also true.
    fn recompute_happiness(&mut self, condition_type: &C) {
        let type_ = self.set.happy;
        let severity = self.set.severity(&self.set.happy);

        let cond = if let Some(dependent) = self.find_unhappy_dependent() {
            // make unhappy dependent reflect in happy condition
            Some(Condition {
                type_,
                status: dependent.status,
                reason: dependent.reason.clone(),
                message: dependent.message.clone(),
                severity,
                ..Default::default()
            })
        } else if *condition_type != self.set.happy {
            // set happy to true
            Some(Condition {
                type_,
                status: ConditionStatus::True,
                severity,
                ..Default::default()
            })
        } else {
            None
        };

        if let Some(cond) = cond {
            self.conditions.set_cond(cond);
        }
    }

    pub fn mark_true(&mut self, condition_type: C) {
        let severity = self.set.severity(&condition_type);
        self.conditions.mark_true(condition_type, severity);
        self.recompute_happiness(&condition_type);
    }

    pub fn mark_true_with_reason(&mut self, condition_type: C, reason: &str, message: Option<String>) {
        let severity = self.set.severity(&condition_type);
        self.conditions.mark_true_with_reason(condition_type, severity, reason.to_string(), message);
        self.recompute_happiness(&condition_type);
    }

    /// Set the status of the condition type to false, as well as the happy condition if this
    /// condition is a dependent.
    pub fn mark_false(&mut self, condition_type: C, reason: &str, message: Option<String>) {
        let severity = self.set.severity(&condition_type);
        self.conditions.mark_false(condition_type, severity, reason.to_string(), message.clone());

        if self.set.dependents.contains(&condition_type) {
            let happy_severity = self.set.severity(&self.set.happy);
            self.conditions.mark_false(self.set.happy, happy_severity, reason.to_string(), message)
        }
    }

    /// Set the status to unknown and also set the happy condition to unknown if no other dependent
    /// condition is in an error state.
    pub fn mark_unknown(&mut self, condition_type: C, reason: &str, message: Option<String>) {
        let severity = self.set.severity(&condition_type);
        self.conditions.mark_unknown(condition_type, severity, reason.to_string(), message.clone());

        // A False dependent trumps an Unknown one
        let any_false = self.set.dependents
            .iter()
            .any(|d| self.conditions.get_cond(d).map(Condition::is_false).unwrap_or(false));

        if any_false {
            if !self.get_top_level_condition().is_false() {
                self.mark_false(self.set.happy, reason, message);
            }
        } else if self.set.dependents.contains(&condition_type) {
            let happy_severity = self.set.severity(&self.set.happy);
            self.conditions.mark_unknown(self.set.happy, happy_severity, reason.to_string(), message);
        }
    }
}
