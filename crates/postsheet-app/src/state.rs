// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::AppMode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub mode: AppMode,
    pub help_visible: bool,
    pub status_line: Option<String>,
    pub dispatch_in_flight: usize,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            mode: AppMode::Nav,
            help_visible: false,
            status_line: None,
            dispatch_in_flight: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    EnterEditMode,
    EnterFindMode,
    ExitToNav,
    ToggleHelp,
    DispatchStarted(&'static str),
    DispatchFinished(String),
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    ModeChanged(AppMode),
    HelpVisibilityChanged(bool),
    StatusUpdated(String),
    StatusCleared,
}

impl AppState {
    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::EnterEditMode => {
                self.mode = AppMode::Edit;
                vec![AppEvent::ModeChanged(self.mode)]
            }
            AppCommand::EnterFindMode => {
                self.mode = AppMode::Find;
                vec![AppEvent::ModeChanged(self.mode)]
            }
            AppCommand::ExitToNav => {
                self.mode = AppMode::Nav;
                vec![AppEvent::ModeChanged(self.mode)]
            }
            AppCommand::ToggleHelp => {
                self.help_visible = !self.help_visible;
                let label = if self.help_visible {
                    "help shown"
                } else {
                    "help hidden"
                };
                vec![
                    AppEvent::HelpVisibilityChanged(self.help_visible),
                    self.set_status(label),
                ]
            }
            AppCommand::DispatchStarted(what) => {
                self.dispatch_in_flight += 1;
                vec![self.set_status(&format!("{what}..."))]
            }
            AppCommand::DispatchFinished(message) => {
                self.dispatch_in_flight = self.dispatch_in_flight.saturating_sub(1);
                vec![self.set_status(&message)]
            }
            AppCommand::SetStatus(message) => vec![self.set_status(&message)],
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    fn set_status(&mut self, message: &str) -> AppEvent {
        self.status_line = Some(message.to_owned());
        AppEvent::StatusUpdated(message.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::{AppCommand, AppEvent, AppState};
    use crate::AppMode;

    #[test]
    fn mode_transitions() {
        let mut state = AppState::default();

        state.dispatch(AppCommand::EnterEditMode);
        assert_eq!(state.mode, AppMode::Edit);

        state.dispatch(AppCommand::ExitToNav);
        assert_eq!(state.mode, AppMode::Nav);

        let events = state.dispatch(AppCommand::EnterFindMode);
        assert_eq!(state.mode, AppMode::Find);
        assert_eq!(events, vec![AppEvent::ModeChanged(AppMode::Find)]);
    }

    #[test]
    fn toggle_help_updates_status() {
        let mut state = AppState::default();

        let events = state.dispatch(AppCommand::ToggleHelp);
        assert!(state.help_visible);
        assert_eq!(
            events,
            vec![
                AppEvent::HelpVisibilityChanged(true),
                AppEvent::StatusUpdated("help shown".to_owned()),
            ],
        );
    }

    #[test]
    fn dispatch_counter_tracks_in_flight_work() {
        let mut state = AppState::default();

        state.dispatch(AppCommand::DispatchStarted("posting"));
        state.dispatch(AppCommand::DispatchStarted("replying"));
        assert_eq!(state.dispatch_in_flight, 2);
        assert_eq!(state.status_line.as_deref(), Some("replying..."));

        state.dispatch(AppCommand::DispatchFinished("done".to_owned()));
        state.dispatch(AppCommand::DispatchFinished("done".to_owned()));
        state.dispatch(AppCommand::DispatchFinished("late".to_owned()));
        assert_eq!(state.dispatch_in_flight, 0);
        assert_eq!(state.status_line.as_deref(), Some("late"));
    }

    #[test]
    fn clear_status() {
        let mut state = AppState::default();
        state.dispatch(AppCommand::SetStatus("hello".to_owned()));

        let events = state.dispatch(AppCommand::ClearStatus);
        assert_eq!(state.status_line, None);
        assert_eq!(events, vec![AppEvent::StatusCleared]);
    }
}
