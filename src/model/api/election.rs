use serde::Serialize;

use crate::model::db::{party_list::PartyList, settings::SystemSettings, voter::Voter};
use crate::voting::Election;

use super::{candidate::CandidateView, party_list::PartyListView, position::PositionView};

/// The election as seen by one user.
#[derive(Debug, Clone, Serialize)]
pub struct ElectionOverview {
    /// In ballot order.
    pub positions: Vec<PositionView>,
    /// Only the candidates the viewer may see.
    pub candidates: Vec<CandidateView>,
    pub party_lists: Vec<PartyListView>,
    pub settings: SystemSettings,
}

impl ElectionOverview {
    /// Administrators see every candidate with their vote count; students see
    /// only the candidates for their level, without counts.
    pub fn for_viewer(
        viewer: &Voter,
        election: Election,
        party_lists: Vec<PartyList>,
        settings: SystemSettings,
    ) -> Self {
        let mut positions: Vec<PositionView> =
            election.positions().cloned().map(PositionView::from).collect();
        positions.sort_by_key(|position| (position.position.display_order, position.id));

        let candidates = election
            .candidates()
            .filter(|candidate| candidate.visible_to(viewer))
            .cloned()
            .map(|candidate| CandidateView::new(candidate, viewer.is_admin))
            .collect();

        Self {
            positions,
            candidates,
            party_lists: party_lists.into_iter().map(PartyListView::from).collect(),
            settings,
        }
    }
}
