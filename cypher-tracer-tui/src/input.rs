use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use cypher_tracer::{Asset, Dashboard};

/// What a key press asks the dashboard to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    NextAsset,
    PrevAsset,
    NextTimeframe,
    PrevTimeframe,
    SelectAsset(Asset),
}

pub fn action_for(key: KeyEvent) -> Option<Action> {
    if key.kind == KeyEventKind::Release {
        return None;
    }

    let action = match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::Quit,
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Right | KeyCode::Char('l') => Action::NextAsset,
        KeyCode::Left | KeyCode::Char('h') => Action::PrevAsset,
        KeyCode::Down | KeyCode::Tab | KeyCode::Char('j') => Action::NextTimeframe,
        KeyCode::Up | KeyCode::BackTab | KeyCode::Char('k') => Action::PrevTimeframe,
        KeyCode::Char(digit @ '1'..='4') => {
            let index = digit as usize - '1' as usize;
            Action::SelectAsset(Asset::ALL[index])
        }
        _ => return None,
    };

    Some(action)
}

/// Apply a selection action. Returns `false` once the user asked to quit.
pub fn apply(action: Action, dashboard: &mut Dashboard) -> bool {
    let selection = dashboard.selection();
    match action {
        Action::Quit => return false,
        Action::NextAsset => dashboard.select_asset(selection.asset.next()),
        Action::PrevAsset => dashboard.select_asset(selection.asset.prev()),
        Action::NextTimeframe => dashboard.select_timeframe(selection.timeframe.next()),
        Action::PrevTimeframe => dashboard.select_timeframe(selection.timeframe.prev()),
        Action::SelectAsset(asset) => dashboard.select_asset(asset),
    }
    true
}
