//! Age-banded phrasing of tutor replies
//!
//! Turns [`Effect`] lists into text. Only Dutch and English phrasings exist;
//! every other language renders Dutch. The age band changes how much of the
//! decomposition is narrated, never which step is asked.

use crate::classifier::Problem;
use crate::language::{AgeBand, Language, Phrasing};
use crate::lexicon::{GrammarSample, GrammarTopic};
use crate::numbers::{display_number, split_tens};
use crate::planner::{Answer, Cue, MicroStep, Scope, BLANK};
use crate::state_machine::Effect;

/// Pick a phrase from a rotation. `n` is usually a turn or attempt count.
fn rotate<'a>(options: &[&'a str], n: usize) -> &'a str {
    options.get(n % options.len().max(1)).copied().unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coach {
    phrasing: Phrasing,
    band: AgeBand,
}

impl Coach {
    pub fn new(language: Language, age: u32) -> Self {
        Self {
            phrasing: language.phrasing(),
            band: AgeBand::from_age(age),
        }
    }

    pub fn phrasing(&self) -> Phrasing {
        self.phrasing
    }

    fn nl_en(&self, nl: &str, en: &str) -> String {
        match self.phrasing {
            Phrasing::Nl => nl.to_string(),
            Phrasing::En => en.to_string(),
        }
    }

    /// Render a transition's effects as one message.
    pub fn render(&self, effects: &[Effect]) -> String {
        effects
            .iter()
            .map(|effect| self.render_effect(effect))
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn render_effect(&self, effect: &Effect) -> String {
        match effect {
            Effect::Intro { problem } => self.intro(problem),
            Effect::Prompt(step) => self.prompt(step),
            Effect::Confirm { filled } => match self.band {
                AgeBand::Student => format!("{} {filled}.", self.nl_en("Klopt:", "Right:")),
                _ => format!("{} {filled}.", self.nl_en("Goed zo!", "Correct!")),
            },
            Effect::Retry { attempt } => self.retry(*attempt),
            Effect::Restate { attempt } => self.restate(*attempt),
            Effect::Reminder { cue } => self.reminder(cue),
            Effect::Together {
                cue,
                deeper,
                attempt,
            } => self.together(cue, *deeper, *attempt),
            Effect::Reveal { problem, answer } => format!(
                "{} {}",
                self.nl_en("Hier is het hele antwoord:", "Here is the whole answer:"),
                self.worked(problem, answer)
            ),
            Effect::Transfer { problem } => format!(
                "{} {}.",
                self.nl_en("Probeer nu een soortgelijke:", "Now try a similar one:"),
                problem.describe(self.phrasing)
            ),
            Effect::Solved {
                problem,
                answer,
                turn,
            } => self.solved(problem, answer, *turn),
        }
    }

    fn intro(&self, problem: &Problem) -> String {
        let described = problem.describe(self.phrasing);
        match self.band {
            AgeBand::Student => format!("{described}:"),
            _ => match self.phrasing {
                Phrasing::Nl => format!("We lossen {described} stap voor stap op."),
                Phrasing::En => format!("Let's solve {described} step by step."),
            },
        }
    }

    /// The pending step: narration followed by the line with the blank.
    pub fn prompt(&self, step: &MicroStep) -> String {
        let narration = self.narrate(&step.cue, &step.line);
        if narration.is_empty() {
            step.line.clone()
        } else {
            format!("{narration} {}", step.line)
        }
    }

    #[allow(clippy::too_many_lines)] // one arm per cue
    fn narrate(&self, cue: &Cue, line: &str) -> String {
        let junior = self.band == AgeBand::Junior;
        let student = self.band == AgeBand::Student;
        match (cue, self.phrasing) {
            (Cue::Tens { a, b, .. }, _) if *a < 10 && *b < 10 => {
                if student {
                    return self.nl_en("Tientallen (geen):", "Tens (none):");
                }
                self.nl_en(
                    "Geen van beide getallen heeft tientallen, dus dit deel is 0:",
                    "Neither number has any tens, so this part is 0:",
                )
            }
            (Cue::Tens { a, b, .. }, phrasing) => {
                if student {
                    return self.nl_en("Tientallen:", "Tens:");
                }
                if !junior {
                    return self.nl_en(
                        "Splits in tientallen en eenheden. Eerst de tientallen:",
                        "Split into tens and ones. First the tens:",
                    );
                }
                let (at, au) = split_tens(*a);
                let (bt, bu) = split_tens(*b);
                match phrasing {
                    Phrasing::Nl => format!(
                        "Splits allebei de getallen in tientallen en eenheden: {a} = {at} + {au} en {b} = {bt} + {bu}. Eerst de tientallen:"
                    ),
                    Phrasing::En => format!(
                        "Split both numbers into tens and ones: {a} = {at} + {au} and {b} = {bt} + {bu}. First the tens:"
                    ),
                }
            }
            (Cue::Ones { round: true }, _) if student => {
                self.nl_en("Eenheden (geen):", "Ones (none):")
            }
            (Cue::Ones { round: true }, _) => self.nl_en(
                "Allebei ronde tientallen, dus de eenheden geven 0:",
                "Both are round tens, so the ones give 0:",
            ),
            (Cue::Ones { .. }, _) if student => self.nl_en("Eenheden:", "Ones:"),
            (Cue::Ones { .. }, _) => self.nl_en("Nu de eenheden:", "Now the ones:"),
            (Cue::Combine, _) if student => self.nl_en("Samen:", "Combine:"),
            (Cue::Combine, _) => self.nl_en(
                "Zet de tientallen en de eenheden nu samen:",
                "Now put the tens and the ones together:",
            ),
            (Cue::SplitFactor { .. }, _) if student => self.nl_en("Splits:", "Split:"),
            (Cue::SplitFactor { factor }, Phrasing::Nl) if *factor < 10 => {
                format!("{factor} heeft geen tientallen, dus alles zit in de eenheden:")
            }
            (Cue::SplitFactor { factor }, Phrasing::En) if *factor < 10 => {
                format!("{factor} has no tens, so all of it is ones:")
            }
            (Cue::SplitFactor { .. }, _) => self.nl_en(
                "We splitsen het tweede getal in tientallen en eenheden:",
                "We split the second number into tens and ones:",
            ),
            (Cue::Partial { .. }, _) if student => String::new(),
            (Cue::Partial { part: 0, .. }, _) => {
                self.nl_en("Keer 0 is altijd 0:", "Anything times 0 is 0:")
            }
            (Cue::Partial { part, factor }, _) if *part < 10 && *factor < 10 => self.nl_en(
                "Deze komt zo uit de tafels:",
                "This one comes straight from the times tables:",
            ),
            (Cue::Partial { part, .. }, Phrasing::Nl) => {
                format!("Keer nu het hele getal met {part}:")
            }
            (Cue::Partial { part, .. }, Phrasing::En) => {
                format!("Now multiply the whole number by {part}:")
            }
            (Cue::SplitPartial { part, factor }, Phrasing::Nl) => {
                format!("Splits {factor} ook, en doe elk deel keer {part}:")
            }
            (Cue::SplitPartial { part, factor }, Phrasing::En) => {
                format!("Split {factor} as well and multiply each part by {part}:")
            }
            (Cue::SumPartials, _) if student => self.nl_en("Som:", "Sum:"),
            (Cue::SumPartials, _) => {
                self.nl_en("Tel de twee delen bij elkaar op:", "Add the two parts:")
            }
            (Cue::Chunk { .. }, _) if student => String::new(),
            (Cue::Chunk { divisor, remaining }, Phrasing::Nl) => {
                format!("We halen groepjes van {divisor} uit {remaining}. Hoeveel is dat?")
            }
            (Cue::Chunk { divisor, remaining }, Phrasing::En) => {
                format!("We take groups of {divisor} out of {remaining}. How much is that?")
            }
            (Cue::TakeAway, _) if student => String::new(),
            (Cue::TakeAway, _) => self.nl_en(
                "Haal dat weg van wat er nog over is:",
                "Take that away from what is left:",
            ),
            (Cue::QuotientSum, _) if student => self.nl_en("Quotiënt:", "Quotient:"),
            (Cue::QuotientSum, _) => self.nl_en(
                "Tel alle groepjes die we weghaalden bij elkaar:",
                "Add up all the groups we took away:",
            ),
            (Cue::WholeTimes, _) => self.nl_en(
                "De deler is groter. Hoe vaak past hij er helemaal in?",
                "The divisor is bigger. How many whole times does it fit?",
            ),
            (Cue::DivideTop { divisor }, Phrasing::Nl) if student => format!("Teller ÷ {divisor}:"),
            (Cue::DivideTop { divisor }, Phrasing::En) if student => format!("Top ÷ {divisor}:"),
            (Cue::DivideTop { divisor }, Phrasing::Nl) => {
                format!("Teller en noemer zijn allebei deelbaar door {divisor}. Eerst de teller:")
            }
            (Cue::DivideTop { divisor }, Phrasing::En) => {
                format!("Top and bottom can both be divided by {divisor}. First the top:")
            }
            (Cue::DivideBottom { .. }, _) => self.nl_en("Nu de noemer:", "Now the bottom:"),
            (Cue::PercentShortcut { percent, divisor }, Phrasing::Nl) => format!(
                "{}% is hetzelfde als delen door {divisor}:",
                display_number(*percent)
            ),
            (Cue::PercentShortcut { percent, divisor }, Phrasing::En) => format!(
                "{}% is the same as dividing by {divisor}:",
                display_number(*percent)
            ),
            (Cue::PercentUnit { percent_unit }, Phrasing::Nl) => {
                format!("Zoek eerst {percent_unit}%:")
            }
            (Cue::PercentUnit { percent_unit }, Phrasing::En) => {
                format!("First find {percent_unit}%:")
            }
            (Cue::PercentScale { .. }, _) => self.nl_en(
                "Keer dat nu om het hele percentage te krijgen:",
                "Now multiply to get the whole percentage:",
            ),
            (
                Cue::Reduce {
                    expression,
                    scope,
                    rewrite,
                },
                phrasing,
            ) => {
                let mut out = String::new();
                if let Some(rewrite) = rewrite {
                    out.push_str(&match phrasing {
                        Phrasing::Nl => {
                            format!("{} is hetzelfde als {}. ", rewrite.from, rewrite.to)
                        }
                        Phrasing::En => {
                            format!("{} is the same as {}. ", rewrite.from, rewrite.to)
                        }
                    });
                }
                let rule = match scope {
                    Scope::Brackets => self.nl_en("haakjes eerst:", "brackets first:"),
                    Scope::Precedence => self.nl_en(
                        "eerst keer en gedeeld door, dan plus en min:",
                        "multiply and divide before adding and subtracting:",
                    ),
                    Scope::LeftToRight => {
                        self.nl_en("van links naar rechts:", "from left to right:")
                    }
                };
                let whole_expression = line
                    .strip_suffix(BLANK)
                    .map(|l| l.trim_end().trim_end_matches('=').trim_end())
                    .is_some_and(|l| l == expression.as_str());
                if whole_expression {
                    out.push_str(&self.nl_en("Reken uit:", "Work it out:"));
                } else if student {
                    out.push_str(&capitalize(&rule));
                } else {
                    out.push_str(&match phrasing {
                        Phrasing::Nl => format!("In {expression} geldt: {rule}"),
                        Phrasing::En => format!("In {expression}, {rule}"),
                    });
                }
                out
            }
            (Cue::Inverse { .. }, _) if student => {
                self.nl_en("Doe de omgekeerde bewerking:", "Undo it:")
            }
            (Cue::Inverse { equation }, Phrasing::Nl) => format!(
                "Om het ontbrekende getal in {equation} te vinden, doen we de omgekeerde bewerking:"
            ),
            (Cue::Inverse { equation }, Phrasing::En) => {
                format!("To find the missing number in {equation}, undo the operation:")
            }
        }
    }

    fn retry(&self, attempt: u32) -> String {
        let n = attempt as usize;
        match self.phrasing {
            Phrasing::Nl => rotate(
                &[
                    "Nog niet helemaal, probeer het nog eens.",
                    "Bijna! Kijk nog eens goed.",
                    "Nog niet. Reken het nog een keer na.",
                ],
                n,
            ),
            Phrasing::En => rotate(
                &[
                    "Not quite, try again.",
                    "Almost! Have another look.",
                    "Not yet. Check it once more.",
                ],
                n,
            ),
        }
        .to_string()
    }

    fn restate(&self, attempt: u32) -> String {
        let n = attempt as usize;
        match self.phrasing {
            Phrasing::Nl => rotate(
                &[
                    "Welk getal hoort op de open plek?",
                    "We maken eerst deze stap af. Wat komt er op de open plek?",
                    "Geef me alleen het getal voor de open plek.",
                ],
                n,
            ),
            Phrasing::En => rotate(
                &[
                    "Which number goes in the blank?",
                    "Let's finish this step first. What goes in the blank?",
                    "Just give me the number for the blank.",
                ],
                n,
            ),
        }
        .to_string()
    }

    fn reminder(&self, cue: &Cue) -> String {
        let (nl, en) = match cue {
            Cue::Tens { .. } => (
                "Tientallen horen bij tientallen. De eenheden komen straks.",
                "Tens go with tens. Leave the ones for later.",
            ),
            Cue::Ones { .. } => (
                "Nu tellen alleen de laatste cijfers, de eenheden.",
                "Now only the last digits count, the ones.",
            ),
            Cue::Combine => (
                "Tel de uitkomst van de tientallen en van de eenheden samen.",
                "Combine the tens result and the ones result.",
            ),
            Cue::SplitFactor { .. } => (
                "Een getal als 14 is 10 en 4.",
                "A number like 14 is 10 and 4.",
            ),
            Cue::Partial { .. } | Cue::SplitPartial { .. } | Cue::Chunk { .. } => (
                "Keer 10 betekent een nul erachter zetten.",
                "Times 10 means putting a zero at the end.",
            ),
            Cue::SumPartials | Cue::QuotientSum => (
                "Tel de delen die je al gevonden hebt bij elkaar op.",
                "Add up the parts you already found.",
            ),
            Cue::TakeAway => (
                "Trek af wat je gebruikt hebt van wat er over was.",
                "Subtract what you used from what was left.",
            ),
            Cue::WholeTimes => (
                "Als de deler groter is, past hij er 0 keer in.",
                "If the divisor is bigger, it fits 0 whole times.",
            ),
            Cue::DivideTop { .. } | Cue::DivideBottom { .. } => (
                "Deel teller en noemer door hetzelfde getal.",
                "Divide the top and the bottom by the same number.",
            ),
            Cue::PercentShortcut { .. } | Cue::PercentUnit { .. } | Cue::PercentScale { .. } => (
                "Procent betekent 'van de 100'.",
                "Percent means 'out of 100'.",
            ),
            Cue::Reduce { .. } => (
                "Eerst haakjes, dan keer en gedeeld door, dan plus en min.",
                "Brackets first, then times and divide, then plus and minus.",
            ),
            Cue::Inverse { .. } => (
                "Plus en min maken elkaar ongedaan.",
                "Plus and minus undo each other.",
            ),
        };
        format!("{} {}", self.nl_en("Tip:", "Tip:"), self.nl_en(nl, en))
    }

    fn together(&self, cue: &Cue, deeper: bool, attempt: u32) -> String {
        if deeper {
            return self.nl_en(
                "We doen het samen, in kleinere stukjes.",
                "Let's do it together, in smaller pieces.",
            );
        }
        let lead = match self.phrasing {
            Phrasing::Nl => rotate(
                &["We doen het samen.", "Geen zorgen, we doen het samen."],
                attempt as usize,
            ),
            Phrasing::En => rotate(
                &["Let's do it together.", "No worries, we'll do it together."],
                attempt as usize,
            ),
        };
        format!("{lead} {}", self.reminder(cue))
    }

    /// `47 + 28 = 75`, `184 ÷ 16 = 11 rest 8`, ...
    fn worked(&self, problem: &Problem, answer: &Answer) -> String {
        let described = problem.describe(self.phrasing);
        match answer {
            Answer::Value { value, unit } => {
                let unit = unit.map(|u| format!(" {}", u.symbol())).unwrap_or_default();
                format!("{described} = {}{unit}.", display_number(*value))
            }
            Answer::Division {
                dividend,
                divisor,
                quotient,
                remainder,
            } => match self.phrasing {
                Phrasing::Nl => format!(
                    "{dividend} ÷ {divisor} = {quotient} rest {remainder}. Controle: {divisor} × {quotient} + {remainder} = {dividend}."
                ),
                Phrasing::En => format!(
                    "{dividend} ÷ {divisor} = {quotient} remainder {remainder}. Check: {divisor} × {quotient} + {remainder} = {dividend}."
                ),
            },
            Answer::Fraction {
                numerator,
                denominator,
            } => format!("{described} = {numerator}/{denominator}."),
            Answer::Missing { value, equation } => match self.phrasing {
                Phrasing::Nl => format!("Het ontbrekende getal is {value}: {equation}."),
                Phrasing::En => format!("The missing number is {value}: {equation}."),
            },
        }
    }

    fn solved(&self, problem: &Problem, answer: &Answer, turn: u32) -> String {
        let summary = match answer {
            Answer::Division {
                dividend,
                divisor,
                quotient,
                remainder,
            } => match self.phrasing {
                Phrasing::Nl => format!(
                    "Dus {dividend} ÷ {divisor} geeft quotiënt {quotient} en rest {remainder}. Controle: {divisor} × {quotient} + {remainder} = {dividend}."
                ),
                Phrasing::En => format!(
                    "So {dividend} ÷ {divisor} gives quotient {quotient}, remainder {remainder}. Check: {divisor} × {quotient} + {remainder} = {dividend}."
                ),
            },
            Answer::Fraction {
                numerator,
                denominator,
            } => match self.phrasing {
                Phrasing::Nl => format!(
                    "Dus {} vereenvoudigd is {numerator}/{denominator}.",
                    problem.describe(self.phrasing)
                ),
                Phrasing::En => format!(
                    "So {} simplified is {numerator}/{denominator}.",
                    problem.describe(self.phrasing)
                ),
            },
            _ => format!("{} {}", self.nl_en("Dus", "So"), self.worked(problem, answer)),
        };
        let praise = match self.phrasing {
            Phrasing::Nl => rotate(&["Goed gedaan!", "Knap gewerkt!", "Top!"], turn as usize),
            Phrasing::En => rotate(&["Well done!", "Great work!", "Nice job!"], turn as usize),
        };
        format!("{summary} {praise}")
    }

    /// Reply to a stop signal. Never a question.
    pub fn closing(&self, turn: usize) -> String {
        match self.phrasing {
            Phrasing::Nl => rotate(
                &[
                    "Goed gewerkt vandaag. Tot de volgende keer!",
                    "Mooi gedaan. Doei!",
                    "Bedankt voor het oefenen. Tot snel!",
                ],
                turn,
            ),
            Phrasing::En => rotate(
                &[
                    "Good work today. See you next time!",
                    "Nice job. Bye for now!",
                    "Thanks for practising. Until next time!",
                ],
                turn,
            ),
        }
        .to_string()
    }

    /// Ack or yes/no with nothing pending
    pub fn polite_close(&self, turn: usize) -> String {
        match self.phrasing {
            Phrasing::Nl => rotate(
                &[
                    "Top. Stuur gerust een nieuwe som als je verder wilt.",
                    "Prima. Je mag altijd een nieuwe opgave sturen.",
                ],
                turn,
            ),
            Phrasing::En => rotate(
                &[
                    "Great. Send me a new problem whenever you like.",
                    "Alright. You can always send another problem.",
                ],
                turn,
            ),
        }
        .to_string()
    }

    /// Ack or yes/no while a question is pending
    pub fn restate_pending(&self, question: &str) -> String {
        match self.phrasing {
            Phrasing::Nl => format!("We blijven even bij deze vraag: {question}"),
            Phrasing::En => format!("Let's stay with this question: {question}"),
        }
    }

    /// Lead-in used when a reply would otherwise repeat the previous one
    pub fn vary_lead(&self, n: usize) -> String {
        match self.phrasing {
            Phrasing::Nl => rotate(
                &[
                    "Nog één keer, alleen deze stap.",
                    "We kijken er nog eens naar.",
                    "Hier is hij nog een keer.",
                ],
                n,
            ),
            Phrasing::En => rotate(
                &[
                    "One more time, just this step.",
                    "Let's look at it once more.",
                    "Here it is again.",
                ],
                n,
            ),
        }
        .to_string()
    }

    /// Fallback when nothing concrete can be inferred
    pub fn generic_next_step(&self) -> String {
        self.nl_en(
            "Laten we het anders aanpakken. Schrijf de som op die je wilt oefenen, dan doen we hem stap voor stap.",
            "Let's take a different route. Write down the problem you want to practise and we'll do it step by step.",
        )
    }

    /// Replaces vague "estimate/guess" prompts
    pub fn exact_instead(&self) -> String {
        self.nl_en(
            "We rekenen het precies uit, stap voor stap.",
            "Let's work it out exactly, one step at a time.",
        )
    }

    /// Wrong answer to a pending line found in the history
    pub fn retry_line(&self, attempt: u32, line: &str) -> String {
        format!("{} {line}", self.retry(attempt))
    }

    pub fn confirm_line(&self, filled: &str) -> String {
        self.render_effect(&Effect::Confirm {
            filled: filled.to_string(),
        })
    }

    /// One grammar micro-step in the target language, explained in the
    /// coach's phrasing.
    pub fn grammar_step(&self, topic: GrammarTopic, sample: &GrammarSample) -> String {
        let GrammarSample {
            verb,
            pronoun,
            noun,
            two,
        } = sample;
        let step = match (topic, self.phrasing) {
            (GrammarTopic::Conjugation, Phrasing::Nl) => format!(
                "We oefenen één werkwoordsvorm. Vul \"{verb}\" in voor \"{pronoun}\": {pronoun} {BLANK}"
            ),
            (GrammarTopic::Conjugation, Phrasing::En) => format!(
                "Let's practise one verb form. Fill in \"{verb}\" for \"{pronoun}\": {pronoun} {BLANK}"
            ),
            (GrammarTopic::PastTense, Phrasing::Nl) => format!(
                "We oefenen de verleden tijd. Zet \"{verb}\" in de verleden tijd voor \"{pronoun}\": {pronoun} {BLANK}"
            ),
            (GrammarTopic::PastTense, Phrasing::En) => format!(
                "Let's practise the past tense. Put \"{verb}\" in the past for \"{pronoun}\": {pronoun} {BLANK}"
            ),
            (GrammarTopic::Plural, Phrasing::Nl) => format!(
                "We oefenen het meervoud. Wat is het meervoud van \"{noun}\"? {two} {BLANK}"
            ),
            (GrammarTopic::Plural, Phrasing::En) => format!(
                "Let's practise plurals. What is the plural of \"{noun}\"? {two} {BLANK}"
            ),
        };
        if self.band == AgeBand::Junior {
            format!(
                "{} {step}",
                self.nl_en("Eén woord is genoeg.", "One word is enough.")
            )
        } else {
            step
        }
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
