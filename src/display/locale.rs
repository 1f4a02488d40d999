use crate::config::Language;

/// The words standing for a text macro.
pub fn word(macro_name: &str, language: Language) -> Option<&'static str> {
    let word = match language {
        Language::En => match macro_name {
            r"\text_forall" => "for every ",
            r"\text_exists" => "there exists ",
            r"\text_in" => " in ",
            r"\text_such_that" => " such that ",
            r"\text_if" => "if ",
            r"\text_then" => ", then ",
            r"\text_and" => " and ",
            r"\text_or" => " or ",
            r"\text_iff" => " if and only if ",
            r"\text_not" => "it is false that ",
            r"\text_belongs" => " belongs to ",
            r"\text_included" => " is included in ",
            r"\text_subset_of" => "a subset of ",
            r"\text_function_from" => "a function from ",
            r"\text_to" => " to ",
            r"\text_sequence_in" => "a sequence in ",
            r"\text_proposition" => "a proposition",
            r"\text_set" => "a set",
            r"\text_element_of" => "an element of ",
            _ => return None,
        },
        Language::Fr => match macro_name {
            r"\text_forall" => "pour tout ",
            r"\text_exists" => "il existe ",
            r"\text_in" => " dans ",
            r"\text_such_that" => " tel que ",
            r"\text_if" => "si ",
            r"\text_then" => ", alors ",
            r"\text_and" => " et ",
            r"\text_or" => " ou ",
            r"\text_iff" => " si et seulement si ",
            r"\text_not" => "il est faux que ",
            r"\text_belongs" => " appartient à ",
            r"\text_included" => " est inclus dans ",
            r"\text_subset_of" => "une partie de ",
            r"\text_function_from" => "une application de ",
            r"\text_to" => " dans ",
            r"\text_sequence_in" => "une suite de ",
            r"\text_proposition" => "une proposition",
            r"\text_set" => "un ensemble",
            r"\text_element_of" => "un élément de ",
            _ => return None,
        },
    };
    Some(word)
}
