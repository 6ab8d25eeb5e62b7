//! The enhancement catalogue.
//!
//! Six products, compiled in. Product ids double as the booking wizard's
//! product selection values.

use rotharc_core::{Price, ProductId};

/// A catalogue entry.
#[derive(Debug)]
pub struct Product {
    pub id: &'static str,
    pub name: &'static str,
    pub category: &'static str,
    pub sub_category: &'static str,
    pub price_eur: u32,
    pub description: &'static str,
    pub short_description: &'static str,
    pub image_url: &'static str,
    pub rating: f32,
    pub review_count: u32,
    pub features: &'static [&'static str],
    pub compatibility: &'static [&'static str],
    pub is_new: bool,
    pub is_featured: bool,
}

impl Product {
    #[must_use]
    pub fn product_id(&self) -> ProductId {
        ProductId::new(self.id)
    }

    #[must_use]
    pub fn price(&self) -> Price {
        Price::euros(self.price_eur)
    }

    /// Rating with one decimal, French style ("4,8").
    #[must_use]
    pub fn rating_label(&self) -> String {
        format!("{:.1}", self.rating).replace('.', ",")
    }
}

static PRODUCTS: [Product; 6] = [
    Product {
        id: "neuro-link-pro",
        name: "NeuroLink Pro",
        category: "Neural",
        sub_category: "Interface",
        price_eur: 4999,
        description: "Le NeuroLink Pro est notre interface neurale de pointe, permettant une connexion directe entre votre cerveau et les systèmes numériques. Avec une bande passante de 10 Tbps et une latence inférieure à 0,5 ms, cette amélioration vous permet de naviguer dans les données, de contrôler des appareils et d'accéder à l'information à la vitesse de la pensée. L'installation est minimalement invasive et réalisée par nos chirurgiens certifiés.",
        short_description: "Interface neurale haute performance pour une connexion directe cerveau-machine.",
        image_url: "https://images.unsplash.com/photo-1581092918056-0c4c3acd3789?ixlib=rb-1.2.1&auto=format&fit=crop&w=1350&q=80",
        rating: 4.8,
        review_count: 124,
        features: &[
            "Connexion neurale directe",
            "Bande passante de 10 Tbps",
            "Latence inférieure à 0,5 ms",
            "Filtres de confidentialité intégrés",
            "Mise à jour sans fil",
            "Garantie à vie",
        ],
        compatibility: &[
            "Tous systèmes d'exploitation",
            "Réalité augmentée",
            "Réalité virtuelle",
        ],
        is_new: true,
        is_featured: true,
    },
    Product {
        id: "ocular-x2",
        name: "Ocular X2",
        category: "Sensoriel",
        sub_category: "Vision",
        price_eur: 3499,
        description: "Les implants Ocular X2 remplacent ou augmentent vos yeux naturels avec une technologie de pointe offrant une vision 20 fois supérieure à la normale. Capables de voir dans le spectre infrarouge et ultraviolet, avec zoom optique 50x et enregistrement vidéo 16K. L'interface utilisateur intégrée vous permet de contrôler les paramètres visuels par simple pensée.",
        short_description: "Implants oculaires avancés avec vision améliorée et fonctionnalités étendues.",
        image_url: "https://images.unsplash.com/photo-1551190822-a9333d879b1f?ixlib=rb-1.2.1&auto=format&fit=crop&w=1350&q=80",
        rating: 4.9,
        review_count: 208,
        features: &[
            "Vision 20x supérieure",
            "Spectre infrarouge et ultraviolet",
            "Zoom optique 50x",
            "Enregistrement vidéo 16K",
            "Interface de contrôle neural",
            "Résistant à l'eau et aux chocs",
        ],
        compatibility: &["NeuroLink Pro", "Systèmes de réalité augmentée"],
        is_new: false,
        is_featured: true,
    },
    Product {
        id: "derma-shield",
        name: "DermaShield",
        category: "Défense",
        sub_category: "Peau",
        price_eur: 2899,
        description: "DermaShield est un remplacement dermique avancé qui renforce votre peau naturelle avec une couche de nano-fibres de carbone et de polymères réactifs. Offrant une résistance accrue aux coupures, brûlures et impacts, tout en conservant la sensation tactile naturelle. La version premium inclut une régulation thermique active et une capacité d'auto-réparation pour les dommages mineurs.",
        short_description: "Remplacement dermique offrant protection et résistance tout en préservant le toucher naturel.",
        image_url: "https://images.unsplash.com/photo-1575408264798-b50b252663e6?ixlib=rb-1.2.1&auto=format&fit=crop&w=1350&q=80",
        rating: 4.6,
        review_count: 87,
        features: &[
            "Résistance aux coupures et impacts",
            "Protection contre les brûlures",
            "Sensation tactile préservée",
            "Régulation thermique",
            "Auto-réparation des dommages mineurs",
            "Personnalisation esthétique disponible",
        ],
        compatibility: &["Tous types corporels", "Compatible avec autres améliorations"],
        is_new: false,
        is_featured: false,
    },
    Product {
        id: "reflex-boost",
        name: "Reflex Boost",
        category: "Performance",
        sub_category: "Réflexes",
        price_eur: 5999,
        description: "Reflex Boost est notre amélioration neuromusculaire phare, augmentant vos temps de réaction jusqu'à 300%. Cette modification reconfigure les connexions entre votre système nerveux et vos muscles, permettant des mouvements plus rapides et plus précis que jamais. Idéal pour les athlètes, les forces de sécurité ou toute personne souhaitant des capacités physiques surhumaines.",
        short_description: "Amélioration neuromusculaire réduisant drastiquement votre temps de réaction.",
        image_url: "https://images.unsplash.com/photo-1550745165-9bc0b252726f?ixlib=rb-1.2.1&auto=format&fit=crop&w=1350&q=80",
        rating: 4.7,
        review_count: 156,
        features: &[
            "Temps de réaction réduit de 300%",
            "Précision de mouvement accrue",
            "Modes d'activation personnalisables",
            "Système anti-fatigue intégré",
            "Compatibilité avec implants musculaires",
            "Garantie de performance",
        ],
        compatibility: &[
            "NeuroLink Pro",
            "Implants musculaires",
            "Systèmes d'endurance",
        ],
        is_new: true,
        is_featured: true,
    },
    Product {
        id: "memory-matrix",
        name: "Memory Matrix",
        category: "Cognitif",
        sub_category: "Mémoire",
        price_eur: 7999,
        description: "Memory Matrix est une amélioration cognitive révolutionnaire qui étend votre capacité mémorielle de façon exponentielle. Grâce à un réseau de nano-processeurs neuraux, vous pouvez stocker, organiser et récupérer des informations avec une précision parfaite. Idéal pour les professionnels, chercheurs ou étudiants, cet implant vous permet également de sauvegarder vos souvenirs et de les revivre avec une clarté cristalline.",
        short_description: "Extension mémorielle permettant un stockage et une récupération parfaite des informations.",
        image_url: "https://images.unsplash.com/photo-1507413245164-6160d8298b31?ixlib=rb-1.2.1&auto=format&fit=crop&w=1350&q=80",
        rating: 4.9,
        review_count: 92,
        features: &[
            "Capacité mémorielle quasi-illimitée",
            "Récupération instantanée des informations",
            "Organisation automatique des souvenirs",
            "Sauvegarde sécurisée des données",
            "Partage de mémoire (avec consentement)",
            "Protection contre la dégénérescence neurale",
        ],
        compatibility: &["NeuroLink Pro", "Systèmes cognitifs avancés"],
        is_new: true,
        is_featured: true,
    },
    Product {
        id: "cardio-prime",
        name: "Cardio Prime",
        category: "Organique",
        sub_category: "Cardiovasculaire",
        price_eur: 8999,
        description: "Cardio Prime est un remplacement cardiaque synthétique de dernière génération, offrant des performances supérieures au cœur humain naturel. Fabriqué à partir de tissus cultivés et de composants synthétiques, ce cœur amélioré pompe le sang plus efficacement, régule automatiquement son rythme selon vos besoins et résiste aux maladies cardiovasculaires. Sa durée de vie estimée dépasse 150 ans avec un entretien minimal.",
        short_description: "Cœur synthétique avancé offrant performances supérieures et longévité exceptionnelle.",
        image_url: "https://images.unsplash.com/photo-1530026186672-2cd00ffc50fe?ixlib=rb-1.2.1&auto=format&fit=crop&w=1350&q=80",
        rating: 4.6,
        review_count: 64,
        features: &[
            "Efficacité de pompage 200%",
            "Auto-régulation selon l'activité",
            "Résistance aux maladies cardiovasculaires",
            "Monitoring continu de la santé",
            "Durée de vie estimée: 150+ ans",
            "Maintenance minimale requise",
        ],
        compatibility: &["Systèmes sanguins améliorés", "Implants pulmonaires"],
        is_new: false,
        is_featured: false,
    },
];

/// Every product, in catalogue order.
#[must_use]
pub fn all() -> &'static [Product] {
    &PRODUCTS
}

#[must_use]
pub fn featured() -> Vec<&'static Product> {
    PRODUCTS.iter().filter(|p| p.is_featured).collect()
}

#[must_use]
pub fn new_arrivals() -> Vec<&'static Product> {
    PRODUCTS.iter().filter(|p| p.is_new).collect()
}

#[must_use]
pub fn by_id(id: &str) -> Option<&'static Product> {
    PRODUCTS.iter().find(|p| p.id == id)
}

/// Products in a category. Matching is exact.
#[must_use]
pub fn by_category(category: &str) -> Vec<&'static Product> {
    PRODUCTS.iter().filter(|p| p.category == category).collect()
}

/// Distinct categories, in catalogue order.
#[must_use]
pub fn categories() -> Vec<&'static str> {
    let mut seen = Vec::new();
    for product in &PRODUCTS {
        if !seen.contains(&product.category) {
            seen.push(product.category);
        }
    }
    seen
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let mut ids: Vec<_> = all().iter().map(|p| p.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), all().len());
    }

    #[test]
    fn test_featured_and_new() {
        let featured: Vec<_> = featured().iter().map(|p| p.id).collect();
        assert_eq!(
            featured,
            ["neuro-link-pro", "ocular-x2", "reflex-boost", "memory-matrix"]
        );
        let new: Vec<_> = new_arrivals().iter().map(|p| p.id).collect();
        assert_eq!(new, ["neuro-link-pro", "reflex-boost", "memory-matrix"]);
    }

    #[test]
    fn test_by_id() {
        let product = by_id("cardio-prime").unwrap();
        assert_eq!(product.price_eur, 8999);
        assert_eq!(product.price().to_string(), "8\u{202f}999 €");
        assert!(by_id("cardio").is_none());
    }

    #[test]
    fn test_by_category() {
        assert_eq!(by_category("Sensoriel").len(), 1);
        assert!(by_category("sensoriel").is_empty());
        assert_eq!(categories().len(), 6);
    }

    #[test]
    fn test_rating_label() {
        assert_eq!(by_id("ocular-x2").unwrap().rating_label(), "4,9");
    }
}
