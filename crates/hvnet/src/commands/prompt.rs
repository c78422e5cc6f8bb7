//! Interactive switch selection.

use std::io::{self, IsTerminal};

use dialoguer::Select;

use hvnet_core::{CoreError, FailFast, PickFirst, SwitchChooser, SwitchRecord};

use crate::cli::GlobalOpts;

/// Asks on the terminal which external switch a public network should use.
#[derive(Debug, Default)]
pub struct PromptChooser;

impl SwitchChooser for PromptChooser {
    fn choose(&mut self, options: &[SwitchRecord]) -> Result<usize, CoreError> {
        let items: Vec<String> = options
            .iter()
            .map(|s| format!("{} ({})", s.name, s.id))
            .collect();
        Select::new()
            .with_prompt("Which switch should the network bridge to?")
            .items(&items)
            .default(0)
            .interact()
            .map_err(|e| CoreError::Internal(format!("prompt failed: {e}")))
    }
}

/// `--yes` picks the first switch; `--non-interactive` or a non-terminal
/// stdin refuses to guess.
pub fn chooser(global: &GlobalOpts) -> Box<dyn SwitchChooser> {
    if global.yes {
        Box::new(PickFirst)
    } else if global.non_interactive || !io::stdin().is_terminal() {
        Box::new(FailFast)
    } else {
        Box::new(PromptChooser)
    }
}
