use std::fmt;

/// One of the five species with a dedicated cgMLST reference database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Organism {
    AcinetobacterBaumannii,
    EnterococcusFaecium,
    KlebsiellaPneumoniae,
    PseudomonasAeruginosa,
    StaphylococcusAureus,
}

impl Organism {
    pub fn abbreviation(&self) -> &'static str {
        match self {
            Organism::AcinetobacterBaumannii => "AB",
            Organism::EnterococcusFaecium => "EF",
            Organism::KlebsiellaPneumoniae => "KP",
            Organism::PseudomonasAeruginosa => "PA",
            Organism::StaphylococcusAureus => "SA",
        }
    }

    pub fn species_key(&self) -> &'static str {
        match self {
            Organism::AcinetobacterBaumannii => "Acinetobacter_baumannii",
            Organism::EnterococcusFaecium => "Enterococcus_faecium",
            Organism::KlebsiellaPneumoniae => "Klebsiella_pneumoniae",
            Organism::PseudomonasAeruginosa => "Pseudomonas_aeruginosa",
            Organism::StaphylococcusAureus => "Staphylococcus_aureus",
        }
    }

    pub fn from_species_key(key: &str) -> Option<Self> {
        match key {
            "Acinetobacter_baumannii" => Some(Organism::AcinetobacterBaumannii),
            "Enterococcus_faecium" => Some(Organism::EnterococcusFaecium),
            "Klebsiella_pneumoniae" => Some(Organism::KlebsiellaPneumoniae),
            "Pseudomonas_aeruginosa" => Some(Organism::PseudomonasAeruginosa),
            "Staphylococcus_aureus" => Some(Organism::StaphylococcusAureus),
            _ => None,
        }
    }

    /// Resolves the organism from the first line of a taxonomic assignment
    /// result, e.g. `Acinetobacter_baumannii\t0.98\t...`.
    ///
    /// Only `genus_species` is significant: a strain suffix after a further
    /// underscore is part of the species token and leaves it unrecognized.
    pub fn from_tax_result_line(line: &str) -> Option<Self> {
        let species = line.trim().split('\t').next()?;
        Self::from_species_key(species)
    }
}

impl fmt::Display for Organism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbreviation())
    }
}
