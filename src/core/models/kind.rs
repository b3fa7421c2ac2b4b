use std::fmt;

/// The fixed set of record variants the console knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kind {
    BaseModel,
    User,
    State,
    City,
    Amenity,
    Place,
    Review,
}

impl Kind {
    pub const ALL: [Kind; 7] = [
        Kind::BaseModel,
        Kind::User,
        Kind::State,
        Kind::City,
        Kind::Amenity,
        Kind::Place,
        Kind::Review,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Kind::BaseModel => "BaseModel",
            Kind::User => "User",
            Kind::State => "State",
            Kind::City => "City",
            Kind::Amenity => "Amenity",
            Kind::Place => "Place",
            Kind::Review => "Review",
        }
    }

    /// Registry lookup from a type tag. Unknown tags yield `None`.
    pub fn from_name(name: &str) -> Option<Kind> {
        Self::ALL.iter().copied().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
