//! Viewer node: the timeline/sequence surface whose markers decorate a
//! clip's preview.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::time::TimeRange;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub range: TimeRange,
    pub name: String,
}

impl Marker {
    pub fn new(range: TimeRange, name: &str) -> Marker {
        Marker {
            range,
            name: name.to_string(),
        }
    }
}

/// Ordered marker collection. Mutations report whether anything changed so
/// the graph can fan out marker-change notifications.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkerList {
    markers: Vec<Marker>,
}

impl MarkerList {
    pub fn new() -> MarkerList {
        MarkerList::default()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Marker> {
        self.markers.iter()
    }

    pub fn add(&mut self, marker: Marker) {
        self.markers.push(marker);
    }

    pub fn remove(&mut self, index: usize) -> Option<Marker> {
        (index < self.markers.len()).then(|| self.markers.remove(index))
    }

    pub fn update(&mut self, index: usize, marker: Marker) -> bool {
        match self.markers.get_mut(index) {
            Some(slot) => {
                *slot = marker;
                true
            }
            None => false,
        }
    }
}

pub struct ViewerNode {
    id: Uuid,
    name: String,
    markers: MarkerList,
}

impl ViewerNode {
    pub fn new(id: Uuid, name: &str) -> ViewerNode {
        ViewerNode {
            id,
            name: name.to_string(),
            markers: MarkerList::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn markers(&self) -> &MarkerList {
        &self.markers
    }

    pub fn markers_mut(&mut self) -> &mut MarkerList {
        &mut self.markers
    }
}
