use std::fmt::{Debug, Display};
use std::hash::Hash;

use crate::{ids::*, types::*};

/// Anything that can live in a `CollectionSnapshot`: identified by `id`,
/// partially updatable through `Patch`.
pub trait Entity: Clone + Debug + PartialEq + Send + Sync + 'static {
    type Id: Clone + Debug + Display + Eq + Hash + Send + Sync + 'static;
    type Patch: Clone + Debug + Send + Sync + 'static;

    fn id(&self) -> &Self::Id;

    fn apply_patch(&mut self, patch: &Self::Patch);
}

impl Entity for Student {
    type Id = StudentId;
    type Patch = StudentPatch;

    fn id(&self) -> &StudentId {
        &self.id
    }

    fn apply_patch(&mut self, patch: &StudentPatch) {
        if let Some(phase) = patch.internship_phase {
            self.internship_phase = phase;
            self.active = phase.is_active();
        }
        // An explicit `active` wins over the phase-derived value; this is what
        // the toggle sends.
        if let Some(active) = patch.active {
            self.active = active;
        }
        if let Some(status) = &patch.application_status {
            self.application_status = Some(status.clone());
        }
    }
}

impl Entity for VisitLog {
    type Id = VisitLogId;
    type Patch = VisitLogPatch;

    fn id(&self) -> &VisitLogId {
        &self.id
    }

    fn apply_patch(&mut self, patch: &VisitLogPatch) {
        if let Some(d) = patch.visit_date {
            self.visit_date = d;
        }
        if let Some(s) = patch.status {
            self.status = s;
        }
        if let Some(t) = patch.visit_type {
            self.visit_type = t;
        }
        if let Some(loc) = &patch.visit_location {
            self.visit_location = Some(loc.clone());
        }
        if let Some(c) = patch.coordinates {
            self.coordinates = Some(c);
        }
        if let Some(photos) = &patch.photos {
            self.photos = photos.clone();
        }
        if let Some(url) = &patch.signed_document_url {
            self.signed_document_url = Some(url.clone());
        }
        if let Some(fields) = &patch.project_fields {
            self.project_fields.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        if let Some(fields) = &patch.observation_fields {
            self.observation_fields.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        if let Some(d) = patch.next_visit_date {
            self.next_visit_date = Some(d);
        }
        if let Some(f) = patch.follow_up_required {
            self.follow_up_required = f;
        }
    }
}
