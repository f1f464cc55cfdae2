//! Per-language pattern tables
//!
//! Built once on first use and shared read-only. The classifier, the coach
//! and the policy rules all take a `&Lexicon`; nothing mutates it after
//! construction.

use crate::language::Language;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

static LEXICON: LazyLock<Lexicon> = LazyLock::new(Lexicon::build);

/// Grammar topics the router recognizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrammarTopic {
    Conjugation,
    PastTense,
    Plural,
}

/// Sample words used to build a grammar micro-step in a given language
#[derive(Debug, Clone, Copy)]
pub struct GrammarSample {
    pub verb: &'static str,
    pub pronoun: &'static str,
    pub noun: &'static str,
    pub two: &'static str,
}

/// Patterns for one language
#[derive(Debug)]
pub struct LanguageTable {
    /// Whole-message closing phrases
    pub stop: Regex,
    /// Whole-message acknowledgements ("ok", "thanks")
    pub ack: Regex,
    /// Whole-message bare yes/no
    pub yes_no: Regex,
    /// "I'm stuck" signals anywhere in the message
    pub stuck: Regex,
    /// Completion claims in an upstream reply
    pub completion: Regex,
    /// Vague "estimate/guess" prompts the linter bans
    pub vague_estimate: Regex,
    /// Open "what's the result?" questions (anti-parrot)
    pub result_question: Regex,
    pub grammar: Vec<(GrammarTopic, Regex)>,
    pub sample: GrammarSample,
}

/// Read-only collection of all language tables
#[derive(Debug)]
pub struct Lexicon {
    tables: HashMap<Language, LanguageTable>,
    filler: HashSet<&'static str>,
}

impl Lexicon {
    /// The process-wide lexicon, built on first access
    pub fn shared() -> &'static Lexicon {
        &LEXICON
    }

    pub fn table(&self, lang: Language) -> &LanguageTable {
        // Every language in the closed set has a table; En is the backstop.
        self.tables
            .get(&lang)
            .or_else(|| self.tables.get(&Language::En))
            .unwrap_or_else(|| unreachable!("lexicon is built for every language"))
    }

    /// Words allowed around a math expression in a standalone problem
    /// statement ("what is", "bereken", "simplify", ...). Shared by all
    /// languages because students mix them freely.
    pub fn is_filler(&self, word: &str) -> bool {
        self.filler.contains(word)
    }

    pub fn is_stop(&self, lang: Language, text: &str) -> bool {
        let norm = normalize_utterance(text);
        !norm.is_empty() && self.table(lang).stop.is_match(&norm)
    }

    pub fn is_ack(&self, lang: Language, text: &str) -> bool {
        let norm = normalize_utterance(text);
        !norm.is_empty() && self.table(lang).ack.is_match(&norm)
    }

    pub fn is_yes_no(&self, lang: Language, text: &str) -> bool {
        let norm = normalize_utterance(text);
        !norm.is_empty() && self.table(lang).yes_no.is_match(&norm)
    }

    pub fn is_stuck(&self, lang: Language, text: &str) -> bool {
        let trimmed = text.trim();
        if !trimmed.is_empty() && trimmed.chars().all(|c| c == '?') {
            return true;
        }
        self.table(lang).stuck.is_match(&normalize_utterance(text))
    }

    pub fn claims_completion(&self, lang: Language, text: &str) -> bool {
        self.table(lang)
            .completion
            .is_match(&normalize_utterance(text))
    }

    pub fn has_vague_estimate(&self, lang: Language, text: &str) -> bool {
        self.table(lang)
            .vague_estimate
            .is_match(&normalize_utterance(text))
    }

    pub fn asks_for_result(&self, lang: Language, text: &str) -> bool {
        self.table(lang)
            .result_question
            .is_match(&normalize_utterance(text))
    }

    pub fn grammar_topic(&self, lang: Language, text: &str) -> Option<GrammarTopic> {
        let norm = normalize_utterance(text);
        self.table(lang)
            .grammar
            .iter()
            .find(|(_, re)| re.is_match(&norm))
            .map(|(topic, _)| *topic)
    }

    fn build() -> Self {
        let mut tables = HashMap::new();
        for lang in Language::ALL {
            tables.insert(lang, build_table(lang));
        }
        let filler = FILLER_WORDS.iter().copied().collect();
        Lexicon { tables, filler }
    }
}

/// Lowercase, drop punctuation (apostrophes included) and collapse
/// whitespace. Patterns in this module are written against this form.
pub fn normalize_utterance(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .filter_map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() {
                Some(c)
            } else if c == '\'' || c == '\u{2019}' {
                None
            } else {
                Some(' ')
            }
        })
        .collect::<String>()
        .to_lowercase();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn alt(parts: &[&str]) -> String {
    parts.join("|")
}

/// `^(?:a|b)(?:\s+(?:a|b|extra))*$`
fn whole_message(parts: &[&str], trailing: &[&str]) -> Regex {
    let head = alt(parts);
    let tail = if trailing.is_empty() {
        head.clone()
    } else {
        format!("{head}|{}", alt(trailing))
    };
    Regex::new(&format!(r"^(?:{head})(?:\s+(?:{tail}))*$")).expect("hardcoded regex")
}

fn anywhere(parts: &[&str]) -> Regex {
    Regex::new(&format!(r"\b(?:{})\b", alt(parts))).expect("hardcoded regex")
}

fn word_prefix(parts: &[&str]) -> Regex {
    Regex::new(&format!(r"\b(?:{})\w*", alt(parts))).expect("hardcoded regex")
}

struct RawTable {
    stop: &'static [&'static str],
    ack: &'static [&'static str],
    yes_no: &'static [&'static str],
    stuck: &'static [&'static str],
    completion: &'static [&'static str],
    vague: &'static [&'static str],
    result_question: &'static [&'static str],
    conjugation: &'static [&'static str],
    past: &'static [&'static str],
    plural: &'static [&'static str],
    sample: GrammarSample,
}

// English and Dutch are the app's main languages; their completion and
// result-question phrases are recognized in every table.
const EN_COMPLETION: &[&str] = &[
    "were done",
    "we are done",
    "thats it",
    "all done",
    "you solved it",
    "youve solved it",
    "you have solved it",
    "were finished",
    "we are finished",
];
const NL_COMPLETION: &[&str] = &[
    "we zijn klaar",
    "dat was het",
    "je hebt het opgelost",
    "helemaal klaar",
    "we zijn er",
];
const EN_RESULT: &[&str] = &[
    "whats the result",
    "what is the result",
    "whats the answer",
    "what is the answer",
    "what do you get",
    "how much is",
    "what is",
    "whats",
    "can you work out",
    "can you solve",
    "can you calculate",
];
const NL_RESULT: &[&str] = &[
    "wat is de uitkomst",
    "wat komt eruit",
    "wat komt er uit",
    "wat is het antwoord",
    "hoeveel is",
    "wat is",
    "kun je uitrekenen",
    "reken uit",
];

const FILLER_WORDS: &[&str] = &[
    // en
    "what", "whats", "is", "are", "calculate", "compute", "solve", "work", "out", "how", "much",
    "please", "can", "you", "help", "me", "with", "simplify", "reduce", "the", "a", "fraction",
    "of", "percent", "equals", "do", "sum", "find", "answer", "this", "i", "need", "to",
    // nl
    "wat", "bereken", "reken", "uit", "hoeveel", "met", "vereenvoudig", "breuk", "de", "het",
    "van", "procent", "kun", "kan", "je", "jij", "alsjeblieft", "graag", "maak", "los", "op",
    "som", "sommetje", "deze", "mij", "helpen", "ik", "wil", "weten", "is",
];

fn build_table(lang: Language) -> LanguageTable {
    let raw = raw_table(lang);
    let completion: Vec<&str> = raw
        .completion
        .iter()
        .chain(EN_COMPLETION)
        .chain(NL_COMPLETION)
        .copied()
        .collect();
    let result_question: Vec<&str> = raw
        .result_question
        .iter()
        .chain(EN_RESULT)
        .chain(NL_RESULT)
        .copied()
        .collect();
    LanguageTable {
        stop: whole_message(raw.stop, raw.ack),
        ack: whole_message(raw.ack, &[]),
        yes_no: whole_message(raw.yes_no, &[]),
        stuck: anywhere(raw.stuck),
        completion: anywhere(&completion),
        vague_estimate: word_prefix(raw.vague),
        result_question: anywhere(&result_question),
        grammar: vec![
            (GrammarTopic::Conjugation, word_prefix(raw.conjugation)),
            (GrammarTopic::PastTense, word_prefix(raw.past)),
            (GrammarTopic::Plural, word_prefix(raw.plural)),
        ],
        sample: raw.sample,
    }
}

#[allow(clippy::too_many_lines)] // one literal table per language
fn raw_table(lang: Language) -> RawTable {
    match lang {
        Language::En => RawTable {
            stop: &["stop", "bye", "goodbye", "quit", "enough", "im done", "i am done", "thats all", "no more", "see you", "lets stop", "i want to stop"],
            ack: &["ok", "okay", "k", "thanks", "thank you", "thx", "got it", "cool", "nice", "great", "alright", "sure", "fine"],
            yes_no: &["yes", "yeah", "yep", "no", "nope", "nah"],
            stuck: &["i dont know", "dont know", "idk", "help", "im stuck", "i am stuck", "no idea", "i dont get it", "dont understand", "hint", "how do i", "too hard"],
            completion: &[],
            vague: &["estimat", "guess", "rough", "approximat"],
            result_question: &[],
            conjugation: &["conjugat", "verb form", "present tense"],
            past: &["past tense", "simple past", "preterit"],
            plural: &["plural"],
            sample: GrammarSample { verb: "walk", pronoun: "I", noun: "book", two: "two" },
        },
        Language::Nl => RawTable {
            stop: &["stop", "stoppen", "doei", "dag", "tot ziens", "klaar", "ik ben klaar", "genoeg", "hou op", "ik wil stoppen", "ik stop", "laat maar"],
            ack: &["ok", "oke", "oké", "okay", "top", "dankje", "dank je", "dankjewel", "bedankt", "thanks", "duidelijk", "snap ik", "prima", "goed", "mooi", "cool"],
            yes_no: &["ja", "jawel", "jep", "nee", "neen", "nope"],
            stuck: &["weet ik niet", "ik weet het niet", "weet niet", "geen idee", "help", "snap het niet", "ik snap het niet", "snap er niks van", "hint", "hoe moet", "te moeilijk", "moeilijk"],
            completion: &[],
            vague: &["schat", "gok", "ongeveer", "raad"],
            result_question: &[],
            conjugation: &["vervoeg", "werkwoordsvervoeging", "tegenwoordige tijd", "werkwoordsvorm"],
            past: &["verleden tijd", "voltooid deelwoord", "imperfectum"],
            plural: &["meervoud"],
            sample: GrammarSample { verb: "werken", pronoun: "ik", noun: "boek", two: "twee" },
        },
        Language::Es => RawTable {
            stop: &["stop", "para", "basta", "adios", "adiós", "hasta luego", "he terminado", "ya termine", "ya terminé"],
            ack: &["ok", "vale", "gracias", "entendido", "bien", "genial", "claro"],
            yes_no: &["si", "sí", "no"],
            stuck: &["no se", "no sé", "ayuda", "no entiendo", "ni idea", "pista", "estoy atascado", "estoy atascada"],
            completion: &["hemos terminado", "ya esta", "ya está", "lo resolviste"],
            vague: &["estim", "adivin", "aproximad"],
            result_question: &["cual es el resultado", "cuál es el resultado", "cuanto es", "cuánto es"],
            conjugation: &["conjuga", "presente"],
            past: &["preterito", "pretérito", "pasado"],
            plural: &["plural"],
            sample: GrammarSample { verb: "hablar", pronoun: "yo", noun: "libro", two: "dos" },
        },
        Language::De => RawTable {
            stop: &["stop", "stopp", "tschuss", "tschüss", "aufhoren", "aufhören", "genug", "ich bin fertig", "auf wiedersehen"],
            ack: &["ok", "okay", "danke", "alles klar", "gut", "super", "verstanden"],
            yes_no: &["ja", "nein", "jo", "nee"],
            stuck: &["weiss nicht", "weiß nicht", "keine ahnung", "hilfe", "verstehe nicht", "tipp", "zu schwer"],
            completion: &["wir sind fertig", "das wars", "geschafft"],
            vague: &["schätz", "schatz", "rate", "ungefähr", "ungefahr"],
            result_question: &["was ist das ergebnis", "was kommt heraus", "wie viel ist"],
            conjugation: &["konjug", "präsens", "prasens"],
            past: &["präteritum", "prateritum", "vergangenheit", "perfekt"],
            plural: &["plural", "mehrzahl"],
            sample: GrammarSample { verb: "spielen", pronoun: "ich", noun: "Buch", two: "zwei" },
        },
        Language::Fr => RawTable {
            stop: &["stop", "arrete", "arrête", "au revoir", "salut", "jai fini", "cest fini", "assez"],
            ack: &["ok", "daccord", "merci", "compris", "bien", "super"],
            yes_no: &["oui", "non", "ouais"],
            stuck: &["je sais pas", "je ne sais pas", "aide", "je comprends pas", "aucune idee", "aucune idée", "indice"],
            completion: &["nous avons fini", "on a fini", "cest termine", "cest terminé"],
            vague: &["estim", "devin", "environ"],
            result_question: &["quel est le resultat", "quel est le résultat", "combien fait"],
            conjugation: &["conjug", "présent", "present"],
            past: &["passé composé", "passe compose", "imparfait", "passé"],
            plural: &["pluriel"],
            sample: GrammarSample { verb: "parler", pronoun: "je", noun: "livre", two: "deux" },
        },
        Language::It => RawTable {
            stop: &["stop", "basta", "ciao", "arrivederci", "ho finito", "fine"],
            ack: &["ok", "va bene", "grazie", "capito", "bene", "perfetto"],
            yes_no: &["si", "sì", "no"],
            stuck: &["non lo so", "non so", "aiuto", "non capisco", "nessuna idea", "suggerimento"],
            completion: &["abbiamo finito", "ecco fatto"],
            vague: &["stim", "indovin", "circa"],
            result_question: &["qual è il risultato", "qual e il risultato", "quanto fa"],
            conjugation: &["coniuga", "presente"],
            past: &["passato prossimo", "passato", "imperfetto"],
            plural: &["plurale"],
            sample: GrammarSample { verb: "parlare", pronoun: "io", noun: "libro", two: "due" },
        },
        Language::Pt => RawTable {
            stop: &["stop", "parar", "chega", "tchau", "adeus", "terminei", "acabei"],
            ack: &["ok", "obrigado", "obrigada", "entendi", "beleza", "certo"],
            yes_no: &["sim", "nao", "não"],
            stuck: &["nao sei", "não sei", "ajuda", "nao entendi", "não entendi", "sem ideia", "dica"],
            completion: &["terminamos", "acabamos"],
            vague: &["estim", "adivinh", "aproximad"],
            result_question: &["qual é o resultado", "qual e o resultado", "quanto é", "quanto e"],
            conjugation: &["conjuga", "presente"],
            past: &["preterito", "pretérito", "passado"],
            plural: &["plural"],
            sample: GrammarSample { verb: "falar", pronoun: "eu", noun: "livro", two: "dois" },
        },
        Language::Da => RawTable {
            stop: &["stop", "farvel", "hej hej", "jeg er færdig", "nok"],
            ack: &["ok", "okay", "tak", "forstået", "fint", "godt"],
            yes_no: &["ja", "nej"],
            stuck: &["ved ikke", "jeg ved det ikke", "hjælp", "forstår ikke", "ingen anelse", "hint"],
            completion: &["vi er færdige", "det var det"],
            vague: &["gæt", "skøn", "cirka"],
            result_question: &["hvad er resultatet", "hvad giver"],
            conjugation: &["bøjning", "bøje", "nutid"],
            past: &["datid", "fortid"],
            plural: &["flertal"],
            sample: GrammarSample { verb: "spise", pronoun: "jeg", noun: "bog", two: "to" },
        },
        Language::Sv => RawTable {
            stop: &["stopp", "stop", "hej då", "sluta", "jag är klar", "nu räcker det"],
            ack: &["ok", "okej", "tack", "förstått", "bra", "fint"],
            yes_no: &["ja", "nej", "japp"],
            stuck: &["vet inte", "jag vet inte", "hjälp", "förstår inte", "ingen aning", "ledtråd"],
            completion: &["vi är klara", "det var allt"],
            vague: &["gissa", "uppskatt", "ungefär"],
            result_question: &["vad är resultatet", "vad blir"],
            conjugation: &["böjning", "konjugation", "presens"],
            past: &["preteritum", "dåtid"],
            plural: &["plural", "flertal"],
            sample: GrammarSample { verb: "prata", pronoun: "jag", noun: "bok", two: "två" },
        },
        Language::No => RawTable {
            stop: &["stopp", "stop", "ha det", "jeg er ferdig", "nok", "slutt"],
            ack: &["ok", "okei", "takk", "skjønner", "bra", "fint"],
            yes_no: &["ja", "nei"],
            stuck: &["vet ikke", "jeg vet ikke", "hjelp", "skjønner ikke", "aner ikke", "hint"],
            completion: &["vi er ferdige", "det var det"],
            vague: &["gjett", "anslå", "omtrent"],
            result_question: &["hva er resultatet", "hva blir"],
            conjugation: &["bøying", "konjugasjon", "presens"],
            past: &["preteritum", "fortid"],
            plural: &["flertall"],
            sample: GrammarSample { verb: "snakke", pronoun: "jeg", noun: "bok", two: "to" },
        },
        Language::Fi => RawTable {
            stop: &["stop", "lopeta", "riittää", "hei hei", "olen valmis", "moikka"],
            ack: &["ok", "okei", "kiitos", "selvä", "hyvä"],
            yes_no: &["kyllä", "joo", "ei"],
            stuck: &["en tiedä", "apua", "en ymmärrä", "ei hajuakaan", "vihje"],
            completion: &["olemme valmiita", "siinä se"],
            vague: &["arvaa", "arvioi", "noin"],
            result_question: &["mikä on tulos", "paljonko on"],
            conjugation: &["taivut", "konjugaatio", "preesens"],
            past: &["imperfekti", "menneisyys"],
            plural: &["monikko"],
            sample: GrammarSample { verb: "puhua", pronoun: "minä", noun: "kirja", two: "kaksi" },
        },
    }
}
