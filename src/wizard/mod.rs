//! Wizard step controller: a linear sequencer for multi-step forms.
//!
//! A [`WizardForm`] owns the in-progress payload and knows which fields each
//! step requires. [`Wizard`] moves between steps, gates `next()` on the
//! current step, and re-validates every step on `finish()` so a payload is
//! never submitted partially. Steps are numbered from 1.

pub mod onboarding;
pub mod weekly;

use std::collections::BTreeSet;

use tracing::debug;

use crate::error::FlowError;

pub use onboarding::{OnboardingPayload, OnboardingQuiz, SYMPTOM_OPTIONS};
pub use weekly::{WeeklyCheckIn, WeeklyCheckInForm};

/// A form driven by a [`Wizard`].
pub trait WizardForm {
    type Payload;

    /// Number of steps.
    const STEPS: usize;

    /// Short title of a step.
    fn step_title(&self, step: usize) -> &'static str;

    /// The first required field of `step` that is missing or invalid.
    fn missing_field(&self, step: usize) -> Option<&'static str>;

    /// Build the payload from every step's slice.
    fn assemble(&self) -> Result<Self::Payload, FlowError>;
}

/// Result of moving backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardMove {
    /// Now at this step.
    Step(usize),
    /// Backed out of step 1; the caller fires the screen's back event.
    Exit,
}

/// Linear step sequencer over a [`WizardForm`].
#[derive(Debug, Clone, Default)]
pub struct Wizard<F> {
    form: F,
    step: usize,
}

impl<F: WizardForm> Wizard<F> {
    pub fn new(form: F) -> Self {
        Self { form, step: 1 }
    }

    pub fn step(&self) -> usize {
        self.step.max(1)
    }

    pub fn total(&self) -> usize {
        F::STEPS
    }

    pub fn is_last(&self) -> bool {
        self.step() == F::STEPS
    }

    pub fn title(&self) -> &'static str {
        self.form.step_title(self.step())
    }

    pub fn form(&self) -> &F {
        &self.form
    }

    /// Values entered on any step stay in the form regardless of movement.
    pub fn form_mut(&mut self) -> &mut F {
        &mut self.form
    }

    fn check(&self, step: usize) -> Result<(), FlowError> {
        match self.form.missing_field(step) {
            Some(field) => Err(FlowError::ValidationIncomplete {
                step,
                field: field.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Advance one step if the current step is complete. On the last step
    /// this only validates; use [`Wizard::finish`] to submit.
    pub fn next(&mut self) -> Result<usize, FlowError> {
        let step = self.step();
        self.check(step)?;
        if step < F::STEPS {
            self.step = step + 1;
            debug!(step = self.step, total = F::STEPS, "Wizard advanced");
        }
        Ok(self.step)
    }

    /// Step back one, or exit the wizard from step 1.
    pub fn prev(&mut self) -> WizardMove {
        let step = self.step();
        if step <= 1 {
            return WizardMove::Exit;
        }
        self.step = step - 1;
        WizardMove::Step(self.step)
    }

    /// Assemble the full payload. Only allowed on the last step; every step
    /// is validated again and the first incomplete one is reported.
    pub fn finish(&self) -> Result<F::Payload, FlowError> {
        if !self.is_last() {
            return Err(FlowError::NotAtLastStep {
                step: self.step(),
                total: F::STEPS,
            });
        }
        for step in 1..=F::STEPS {
            self.check(step)?;
        }
        self.form.assemble()
    }
}

/// Multi-select field with toggle semantics: no duplicates, order not
/// significant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiSelect(BTreeSet<String>);

impl MultiSelect {
    /// Toggle a value. Returns whether it is selected afterwards. Blank
    /// values are ignored.
    pub fn toggle(&mut self, value: &str) -> bool {
        let value = value.trim();
        if value.is_empty() {
            return false;
        }
        if self.0.remove(value) {
            false
        } else {
            self.0.insert(value.to_string());
            true
        }
    }

    pub fn contains(&self, value: &str) -> bool {
        self.0.contains(value.trim())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}
