//! `Workspace`: one `ClientList` plus per-workspace layout parameters.
//! `TOTAL_WORKSPACES` of these exist for the lifetime of the process.

use crate::client_list::ClientList;
use crate::config::INITIAL_SPECIAL_WIDTH;

pub struct Workspace {
    pub clients: ClientList,
    pub special_width: i32,
}

impl Workspace {
    pub fn new() -> Self {
        Workspace {
            clients: ClientList::new(),
            special_width: INITIAL_SPECIAL_WIDTH,
        }
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Workspace::new()
    }
}
