use cogtask_core::TaskKind;
use serde::{Deserialize, Serialize};

use crate::digit_span::DigitSpanResult;
use crate::fluency::FluencyResult;
use crate::inhibition::InhibitionResult;
use crate::orientation::OrientationResult;
use crate::reaction::ReactionResult;
use crate::stroop::StroopResult;
use crate::symbol_coding::SymbolCodingResult;
use crate::trails::TrailsResult;
use crate::verbal_list::VerbalListResult;
use crate::visual_memory::VisualMemoryResult;

/// Any task result, tagged with the task it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "task", content = "result", rename_all = "camelCase")]
pub enum TaskOutcome {
    ReactionTime(ReactionResult),
    Inhibition(InhibitionResult),
    Trails(TrailsResult),
    SymbolCoding(SymbolCodingResult),
    DigitSpan(DigitSpanResult),
    VisualMemory(VisualMemoryResult),
    Fluency(FluencyResult),
    Orientation(OrientationResult),
    Stroop(StroopResult),
    VerbalList(VerbalListResult),
}

macro_rules! outcome_from {
    ($($variant:ident($result:ty)),* $(,)?) => {
        impl TaskOutcome {
            pub fn kind(&self) -> TaskKind {
                match self {
                    $(TaskOutcome::$variant(_) => TaskKind::$variant,)*
                }
            }
        }

        $(
            impl From<$result> for TaskOutcome {
                fn from(result: $result) -> Self {
                    TaskOutcome::$variant(result)
                }
            }
        )*
    };
}

outcome_from!(
    ReactionTime(ReactionResult),
    Inhibition(InhibitionResult),
    Trails(TrailsResult),
    SymbolCoding(SymbolCodingResult),
    DigitSpan(DigitSpanResult),
    VisualMemory(VisualMemoryResult),
    Fluency(FluencyResult),
    Orientation(OrientationResult),
    Stroop(StroopResult),
    VerbalList(VerbalListResult),
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_json_shape() {
        let outcome = TaskOutcome::from(SymbolCodingResult { raw_score: 42 });
        assert_eq!(outcome.kind(), TaskKind::SymbolCoding);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "task": "symbolCoding", "result": { "rawScore": 42 } })
        );
        let back: TaskOutcome = serde_json::from_value(json).unwrap();
        assert_eq!(back, outcome);
    }
}
