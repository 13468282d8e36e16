use std::sync::Mutex;

use rand::{SeedableRng, rngs::StdRng, seq::IndexedRandom};

const ANIMALS: [&str; 20] = [
    "Gato", "Perro", "León", "Tigre", "Oso", "Lobo", "Zorro", "Erizo", "Búho", "Águila", "Delfín",
    "Ballena", "Pardo", "Koala", "Panda", "Canguro", "Mapache", "Puma", "Jaguar", "Lince",
];

const ADJECTIVES: [&str; 20] = [
    "Misterioso",
    "Veloz",
    "Valiente",
    "Curioso",
    "Amigable",
    "Silencioso",
    "Astuto",
    "Feroz",
    "Sabio",
    "Ágil",
    "Divertido",
    "Contento",
    "Brillante",
    "Audaz",
    "Tranquilo",
    "Rápido",
    "Fuerte",
    "Dormilón",
    "Juguetón",
    "Leal",
];

/// Hands out display names like "Zorro Astuto" for anonymous commenters.
/// Names are not unique.
pub struct AnonymousNameGenerator {
    rng: Mutex<StdRng>,
}

impl AnonymousNameGenerator {
    pub fn new() -> Self {
        Self::with_seed(rand::random())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn generate(&self) -> String {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());

        let animal = ANIMALS.choose(&mut *rng).copied().unwrap_or(ANIMALS[0]);
        let adjective = ADJECTIVES
            .choose(&mut *rng)
            .copied()
            .unwrap_or(ADJECTIVES[0]);

        format!("{animal} {adjective}")
    }
}

impl Default for AnonymousNameGenerator {
    fn default() -> Self {
        Self::new()
    }
}
