//! Five-step weekly check-in: one 1-5 level per question.

use serde::{Deserialize, Serialize};

use crate::error::FlowError;

use super::WizardForm;

const QUESTIONS: [&str; 5] = [
    "Stress level last week",
    "Concentration / focus",
    "Overall energy level",
    "Workout productivity",
    "Social battery",
];

pub const MIN_LEVEL: u8 = 1;
pub const MAX_LEVEL: u8 = 5;

/// In-progress check-in. Index `i` holds the answer to step `i + 1`.
#[derive(Debug, Clone, Default)]
pub struct WeeklyCheckInForm {
    levels: [Option<u8>; 5],
}

impl WeeklyCheckInForm {
    /// Record the level for a step. Levels outside 1-5 are rejected and the
    /// previous answer is kept.
    pub fn set_level(&mut self, step: usize, level: u8) -> Result<(), FlowError> {
        if !(1..=QUESTIONS.len()).contains(&step) || !(MIN_LEVEL..=MAX_LEVEL).contains(&level) {
            return Err(FlowError::ValidationIncomplete {
                step,
                field: "a level from 1 to 5".to_string(),
            });
        }
        self.levels[step - 1] = Some(level);
        Ok(())
    }

    pub fn level(&self, step: usize) -> Option<u8> {
        step.checked_sub(1).and_then(|i| self.levels.get(i).copied().flatten())
    }
}

/// Body of "submit weekly check-in" (without the user id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyCheckIn {
    pub stress: u8,
    pub concentration: u8,
    pub energy: u8,
    pub workout: u8,
    pub social: u8,
}

impl WizardForm for WeeklyCheckInForm {
    type Payload = WeeklyCheckIn;
    const STEPS: usize = 5;

    fn step_title(&self, step: usize) -> &'static str {
        step.checked_sub(1)
            .and_then(|i| QUESTIONS.get(i).copied())
            .unwrap_or("")
    }

    fn missing_field(&self, step: usize) -> Option<&'static str> {
        match self.level(step) {
            Some(_) => None,
            None => Some(self.step_title(step)),
        }
    }

    fn assemble(&self) -> Result<WeeklyCheckIn, FlowError> {
        let level = |step: usize| {
            self.level(step).ok_or_else(|| FlowError::ValidationIncomplete {
                step,
                field: self.step_title(step).to_string(),
            })
        };
        Ok(WeeklyCheckIn {
            stress: level(1)?,
            concentration: level(2)?,
            energy: level(3)?,
            workout: level(4)?,
            social: level(5)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::Wizard;

    #[test]
    fn levels_are_range_checked() {
        let mut form = WeeklyCheckInForm::default();
        assert!(form.set_level(1, 0).is_err());
        assert!(form.set_level(1, 6).is_err());
        assert!(form.set_level(6, 3).is_err());
        assert!(form.level(1).is_none());
        form.set_level(1, 4).unwrap();
        assert_eq!(form.level(1), Some(4));
    }

    #[test]
    fn each_step_requires_its_level() {
        let mut wizard = Wizard::new(WeeklyCheckInForm::default());
        assert!(wizard.next().is_err());
        for step in 1..=5u8 {
            wizard.form_mut().set_level(step as usize, step).unwrap();
            wizard.next().unwrap();
        }
        let payload = wizard.finish().unwrap();
        assert_eq!(
            payload,
            WeeklyCheckIn {
                stress: 1,
                concentration: 2,
                energy: 3,
                workout: 4,
                social: 5
            }
        );
    }

    #[test]
    fn back_and_change_keeps_other_answers() {
        let mut wizard = Wizard::new(WeeklyCheckInForm::default());
        wizard.form_mut().set_level(1, 2).unwrap();
        wizard.next().unwrap();
        wizard.form_mut().set_level(2, 3).unwrap();
        wizard.prev();
        wizard.form_mut().set_level(1, 5).unwrap();
        assert_eq!(wizard.form().level(1), Some(5));
        assert_eq!(wizard.form().level(2), Some(3));
    }
}
