use std::time::Duration;
use tracing::trace;

use crate::model::Model;
use csvsight::domain::{Message, SightConfig, SightError};
use ratatui::crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &SightConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, SightError> {
        if event::poll(Duration::from_millis(self.event_poll_time))?
            && let Event::Key(key) = event::read()?
            && key.kind == event::KeyEventKind::Press
        {
            // The command line consumes every key until it is closed.
            if model.raw_keyevents() {
                return Ok(Some(Message::RawKey(key)));
            }
            return Ok(Self::handle_key(key));
        }
        Ok(None)
    }

    fn handle_key(key: KeyEvent) -> Option<Message> {
        let message = match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Message::Quit),
            (KeyCode::Char('q'), _) => Some(Message::Quit),
            (KeyCode::Esc, _) => Some(Message::Exit),
            (KeyCode::Enter, _) => Some(Message::Enter),
            (KeyCode::Char('?'), _) => Some(Message::Help),
            (KeyCode::Tab, _) => Some(Message::NextPane),
            (KeyCode::BackTab, _) => Some(Message::PrevPane),
            (KeyCode::Up, _) | (KeyCode::Char('k'), _) => Some(Message::MoveUp),
            (KeyCode::Down, _) | (KeyCode::Char('j'), _) => Some(Message::MoveDown),
            (KeyCode::PageUp, _) => Some(Message::MovePageUp),
            (KeyCode::PageDown, _) => Some(Message::MovePageDown),
            (KeyCode::Char('b'), _) => Some(Message::BarChart),
            (KeyCode::Char('p'), _) => Some(Message::PieChart),
            (KeyCode::Char('l'), _) => Some(Message::LineChart),
            (KeyCode::Char('m'), _) => Some(Message::ToggleMultiValue),
            (KeyCode::Char('t'), _) => Some(Message::UseAsTextColumn),
            (KeyCode::Char('f'), _) => Some(Message::Filter),
            (KeyCode::Char('x'), _) => Some(Message::ClearFilters),
            (KeyCode::Char('y'), _) => Some(Message::CopyDocument),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> Option<Message> {
        Controller::handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn chart_keys() {
        assert_eq!(key(KeyCode::Char('b')), Some(Message::BarChart));
        assert_eq!(key(KeyCode::Char('p')), Some(Message::PieChart));
        assert_eq!(key(KeyCode::Char('l')), Some(Message::LineChart));
    }

    #[test]
    fn navigation_keys() {
        assert_eq!(key(KeyCode::Down), Some(Message::MoveDown));
        assert_eq!(key(KeyCode::Char('k')), Some(Message::MoveUp));
        assert_eq!(key(KeyCode::BackTab), Some(Message::PrevPane));
        assert_eq!(key(KeyCode::Char('z')), None);
    }

    #[test]
    fn ctrl_c_quits() {
        let msg = Controller::handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert_eq!(msg, Some(Message::Quit));
    }
}
