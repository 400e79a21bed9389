/*!
 * Tests for the translatability classifiers
 */

use traduko::{is_translatable, is_translatable_context};

/// Table of strings the value classifier must reject
#[test]
fn test_isTranslatable_machineData_shouldBeRejected() {
    let rejected = [
        "",
        "   ",
        "\t\n",
        "42",
        "  1987  ",
        "0042",
        "!!!",
        "---",
        "___",
        "{player_name}",
        "{0}",
        "<br>",
        "</font>",
        "<color=#ff0000>",
        "save_slot_3",
        "quest_reward_gold",
        r"caf\u00e9 already encoded",
    ];
    for text in rejected {
        assert!(!is_translatable(text), "accepted machine data: {:?}", text);
    }
}

/// Table of strings the value classifier must accept
#[test]
fn test_isTranslatable_prose_shouldBeAccepted() {
    let accepted = [
        "Hello",
        "Hello world",
        "Ciao, come stai?",
        "Press {key} to continue",
        "You gained 250 gold!",
        "<b>Warning:</b> low health",
        "Nivel 3: El bosque",
        "こんにちは",
    ];
    for text in accepted {
        assert!(is_translatable(text), "rejected prose: {:?}", text);
    }
}

#[test]
fn test_isTranslatable_surroundingWhitespace_shouldNotMatter() {
    assert!(is_translatable("  Hello  "));
    assert!(!is_translatable("  123  "));
}

#[test]
fn test_isTranslatable_underscoreInsideSentence_shouldBeAccepted() {
    // The identifier heuristic only fires on space-less tokens
    assert!(is_translatable("the file save_slot_3 is corrupt"));
    assert!(!is_translatable("save_slot_3"));
}

#[test]
fn test_isTranslatableContext_keyLikeTokens_shouldBeRejected() {
    let rejected = [
        "1165\tBIRTHDAY",
        "ItemName",
        "questGiver",
        "slot2",
        "npc_merchant",
        "<Speaker>Anna</Speaker>",
    ];
    for text in rejected {
        assert!(
            !is_translatable_context(text),
            "accepted key-like context: {:?}",
            text
        );
    }
}

#[test]
fn test_isTranslatableContext_proseAndPlainTokens_shouldBeAccepted() {
    let accepted = [
        "birthday",
        "MENU",
        "Spoken by the innkeeper",
        "Tooltip shown on hover",
    ];
    for text in accepted {
        assert!(
            is_translatable_context(text),
            "rejected context prose: {:?}",
            text
        );
    }
}

#[test]
fn test_isTranslatableContext_isStricterThanValueClassifier() {
    // Everything the value classifier rejects stays rejected here
    for text in ["", "42", "{slot}", "item_id"] {
        assert!(!is_translatable_context(text));
    }
    // And some valid values are still not valid contexts
    assert!(is_translatable("ItemName"));
    assert!(!is_translatable_context("ItemName"));
}
