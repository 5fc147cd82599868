// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::MutationKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationPhase {
    Idle,
    Submitting(MutationKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub level: ToastLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationState {
    pub phase: MutationPhase,
    pub toast: Option<Toast>,
}

impl Default for MutationState {
    fn default() -> Self {
        Self {
            phase: MutationPhase::Idle,
            toast: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationCommand {
    Submit(MutationKind),
    Resolve(Result<(), String>),
    DismissToast,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationEvent {
    Submitting(MutationKind),
    Busy,
    Succeeded(MutationKind),
    RefreshRequested,
    Failed(String),
    Idle,
    ToastShown(Toast),
    ToastCleared,
}

impl MutationState {
    pub fn is_submitting(&self) -> bool {
        matches!(self.phase, MutationPhase::Submitting(_))
    }

    pub fn dispatch(&mut self, command: MutationCommand) -> Vec<MutationEvent> {
        match command {
            MutationCommand::Submit(kind) => {
                if self.is_submitting() {
                    return vec![MutationEvent::Busy];
                }
                self.phase = MutationPhase::Submitting(kind);
                vec![MutationEvent::Submitting(kind)]
            }
            MutationCommand::Resolve(result) => {
                let MutationPhase::Submitting(kind) = self.phase else {
                    return Vec::new();
                };
                self.phase = MutationPhase::Idle;
                match result {
                    Ok(()) => vec![
                        MutationEvent::Succeeded(kind),
                        self.show_toast(ToastLevel::Success, kind.past_tense()),
                        MutationEvent::RefreshRequested,
                        MutationEvent::Idle,
                    ],
                    Err(message) => vec![
                        MutationEvent::Failed(message.clone()),
                        self.show_toast(ToastLevel::Error, &message),
                        MutationEvent::Idle,
                    ],
                }
            }
            MutationCommand::DismissToast => {
                self.toast = None;
                vec![MutationEvent::ToastCleared]
            }
        }
    }

    fn show_toast(&mut self, level: ToastLevel, message: &str) -> MutationEvent {
        let toast = Toast {
            level,
            message: message.to_owned(),
        };
        self.toast = Some(toast.clone());
        MutationEvent::ToastShown(toast)
    }
}
