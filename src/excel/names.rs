//! Normalización de nombres de tareas a un vocabulario canónico.
//!
//! Los nombres llegan con acentos eslovacos/checos, mayúsculas y espacios
//! inconsistentes. Se evalúa una tabla ordenada de reglas sobre el nombre en
//! minúsculas; gana la primera que coincide. El orden importa: "kontrola
//! technická STK a kontrola emisná" cumple las dos primeras reglas y queda
//! como STK.

/// Predicado de coincidencia sobre un texto ya pasado a minúsculas.
#[derive(Debug, Clone, Copy)]
pub enum Pattern {
    /// Alguna de las subcadenas está contenida.
    Any(&'static [&'static str]),
    /// Todas las subcadenas están contenidas.
    All(&'static [&'static str]),
    Custom(fn(&str) -> bool),
}

impl Pattern {
    pub fn matches(&self, lower: &str) -> bool {
        match self {
            Pattern::Any(pats) => pats.iter().any(|p| lower.contains(p)),
            Pattern::All(pats) => pats.iter().all(|p| lower.contains(p)),
            Pattern::Custom(f) => f(lower),
        }
    }
}

/// Par (predicado, resultado) de una tabla de reglas ordenada.
#[derive(Debug, Clone, Copy)]
pub struct Rule<T> {
    pub pattern: Pattern,
    pub result: T,
}

/// Primera regla cuyo patrón coincide con `text` (se compara en minúsculas).
pub fn first_match<T: Copy>(rules: &[Rule<T>], text: &str) -> Option<T> {
    let lower = text.trim().to_lowercase();
    rules.iter().find(|r| r.pattern.matches(&lower)).map(|r| r.result)
}

pub const NAME_RULES: &[Rule<&str>] = &[
    Rule {
        pattern: Pattern::Any(&["kontrola technicka stk", "kontrola technická stk"]),
        result: "Technická kontrola (STK)",
    },
    Rule {
        pattern: Pattern::Any(&["kontrola emisná", "technická kontrola a emisná"]),
        result: "Emisná kontrola (EK)",
    },
    Rule {
        pattern: Pattern::Any(&["výmena motorového oleja", "výměna motorového oleja"]),
        result: "Výmena oleja v Motore",
    },
    Rule {
        pattern: Pattern::Any(&["výmena oleja v retarder", "výmena oleja v retardery"]),
        result: "Výmena oleja v Retardery",
    },
    Rule {
        pattern: Pattern::Any(&["výměna prevodového oleja", "výmena prevodového oleja"]),
        result: "Výmena oleja v Prevodovke",
    },
    Rule {
        pattern: Pattern::Any(&["výmena oleja diferenciálu"]),
        result: "Výmena oleja v Diferenciali",
    },
    Rule {
        pattern: Pattern::Any(&["vymena dpf", "výmena dpf filtra"]),
        result: "Servis DPF filtra",
    },
    Rule {
        pattern: Pattern::Any(&["kontrola stiahnutie tachografu"]),
        result: "Stiahnutie tachografu",
    },
    Rule {
        pattern: Pattern::Any(&["kontrola pneumatik ciachovanie tachogr"]),
        result: "Ciachovanie tachografu",
    },
    Rule {
        pattern: Pattern::Any(&["servis ročná prehliadka ťahač"]),
        result: "Ročná prehliadka ťahača",
    },
    Rule {
        pattern: Pattern::Any(&["servis ročná prehliadka náves"]),
        result: "Ročná prehliadka návese",
    },
    Rule {
        pattern: Pattern::Any(&["mýto diaľničná známka ročná sk"]),
        result: "Diaľničná známka Slovensko",
    },
    Rule {
        pattern: Pattern::Any(&["dokument l- certifikát", "lärmarmes kraft"]),
        result: "L-Certifikát",
    },
    Rule {
        pattern: Pattern::All(&["servis kontrola komplet", "bŕzd"]),
        result: "Kontrola bŕzd",
    },
    Rule {
        pattern: Pattern::Any(&["servis kontrola hasiaci prístroj"]),
        result: "Kontrola hasiaci prístroj",
    },
    Rule {
        pattern: Pattern::Any(&["servis kontrola nastavenie ventilov"]),
        result: "Nastavenie ventilov",
    },
];

/// Nombre canónico de una tarea. Sin regla aplicable se devuelve el original
/// con sólo la primera letra en mayúscula.
pub fn normalize_service_name(original: &str) -> String {
    match first_match(NAME_RULES, original) {
        Some(canonical) => canonical.to_string(),
        None => capitalize_first(original),
    }
}

fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
