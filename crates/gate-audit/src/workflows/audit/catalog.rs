use super::domain::{GateType, Question, QuestionCategory, ResolvedQuestion, WeightMap};
use QuestionCategory::{General, InboundSpecific, OutboundSpecific};

/// Read-only checklist definition. Declaration order is display order.
#[derive(Debug)]
pub struct QuestionCatalog {
    questions: &'static [Question],
}

static STANDARD: QuestionCatalog = QuestionCatalog::new(STANDARD_QUESTIONS);

impl QuestionCatalog {
    pub const fn new(questions: &'static [Question]) -> Self {
        Self { questions }
    }

    pub fn standard() -> &'static QuestionCatalog {
        &STANDARD
    }

    pub fn questions(&self) -> &[Question] {
        self.questions
    }

    pub fn questions_for_category(&self, category: QuestionCategory) -> Vec<&Question> {
        self.questions
            .iter()
            .filter(|question| question.category == category)
            .collect()
    }

    pub fn find(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|question| question.id == id)
    }

    /// Display label for `id`, or the id itself for questions no longer in the catalog.
    pub fn label_for<'a>(&self, id: &'a str) -> &'a str {
        match self.find(id) {
            Some(question) => question.label,
            None => id,
        }
    }

    /// Declaration index, used to break ties deterministically.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.questions.iter().position(|question| question.id == id)
    }

    pub fn default_weights(&self) -> WeightMap {
        self.questions
            .iter()
            .map(|question| (question.id.to_string(), question.default_weight))
            .collect()
    }

    /// Applicable questions for a gate type with effective weights. General block first,
    /// then the gate-specific block, each in declaration order.
    pub fn resolve(&self, gate_type: GateType, weights: &WeightMap) -> Vec<ResolvedQuestion> {
        [General, InboundSpecific, OutboundSpecific]
            .into_iter()
            .filter(|category| category.applies_to(gate_type))
            .flat_map(|category| {
                self.questions
                    .iter()
                    .filter(move |question| question.category == category)
            })
            .map(|question| ResolvedQuestion {
                id: question.id,
                label: question.label,
                weight: weights
                    .get(question.id)
                    .copied()
                    .unwrap_or(question.default_weight),
            })
            .collect()
    }
}

const fn q(
    id: &'static str,
    label: &'static str,
    category: QuestionCategory,
    default_weight: u32,
) -> Question {
    Question {
        id,
        label,
        category,
        default_weight,
    }
}

const STANDARD_QUESTIONS: &[Question] = &[
    q("gen_on_time", "Did the guard arrive on time (within 10 minutes)?", General, 5),
    q("gen_uniform", "Is the guard wearing the proper uniform and hi-vis vest?", General, 4),
    q("gen_professional", "Does the guard interact professionally with drivers?", General, 3),
    q("gen_attentive", "Is the guard attentive at their post?", General, 3),
    // YMS gate-in completeness, one entry per field
    q("in_yms_driver_name", "YMS Gate-In: Driver Name recorded", InboundSpecific, 2),
    q("in_yms_driver_phone", "YMS Gate-In: Driver Phone Number recorded", InboundSpecific, 1),
    q("in_yms_license", "YMS Gate-In: Driver License / Badge Number recorded", InboundSpecific, 2),
    q("in_yms_trailer", "YMS Gate-In: Trailer Number recorded", InboundSpecific, 2),
    q("in_yms_tractor", "YMS Gate-In: Tractor Number recorded", InboundSpecific, 2),
    q("in_yms_scac", "YMS Gate-In: Correct SCAC (Carrier Code) recorded", InboundSpecific, 2),
    q("in_yms_vehicle_type", "YMS Gate-In: Vehicle Type recorded", InboundSpecific, 1),
    q("in_yms_vehicle_status", "YMS Gate-In: Vehicle Status recorded", InboundSpecific, 1),
    q("in_yms_load_type", "YMS Gate-In: Understands difference and records Live Load vs Drop Load", InboundSpecific, 2),
    q("in_yms_po", "YMS Gate-In: PO Number(s) recorded correctly", InboundSpecific, 4),
    q("in_yms_seal", "YMS Gate-In: Seal Number recorded correctly", InboundSpecific, 3),
    q("in_yms_origin_dest", "YMS Gate-In: Origin/Destination recorded", InboundSpecific, 1),
    q("in_yms_location", "YMS Gate-In: YMS Location on yard recorded", InboundSpecific, 1),
    q("in_identify_po_on_bol", "Knows where to identify PO numbers on a BOL", InboundSpecific, 3),
    q("in_input_pos_multiple", "Properly inputs single and multiple POs into YMS", InboundSpecific, 4),
    q("in_reefer_temp_gauge", "Checks reefer temperature gauge and references setpoint from BOL", InboundSpecific, 5),
    q("in_understand_temp_range", "Understands acceptable reefer temperature range vs setpoint", InboundSpecific, 4),
    q("in_check_fuel_and_requirements", "Checks fuel level and understands inbound fuel requirements", InboundSpecific, 3),
    q("in_check_seal_matches_bol", "Checks the seal and verifies it matches the BOL", InboundSpecific, 4),
    q("in_one_network_accuracy", "Enters all required POs into One Network accurately", InboundSpecific, 5),
    q("in_take_required_pics", "Accurately takes all required pictures of incoming trailers", InboundSpecific, 3),
    q("in_use_cones_or_gate_arms", "Utilizes cones or gate arms to stop traffic during processing", InboundSpecific, 2),
    q("out_lane1_automation_utilize", "Understands how to utilize Lane 1 automation", OutboundSpecific, 3),
    q("out_lane1_only_kroger_delivery", "Understands only Kroger Delivery Loads use Lane 1 automation", OutboundSpecific, 3),
    // YMS gate-out completeness
    q("out_yms_driver_name", "YMS Gate-Out: Driver Name recorded", OutboundSpecific, 2),
    q("out_yms_tractor", "YMS Gate-Out: Tractor Number recorded", OutboundSpecific, 2),
    q("out_yms_seal", "YMS Gate-Out: Seal Number recorded", OutboundSpecific, 3),
    q("out_yms_setpoint", "YMS Gate-Out: Temperature setpoint recorded", OutboundSpecific, 4),
    q("out_yms_physical_temp", "YMS Gate-Out: Physical trailer temperature recorded", OutboundSpecific, 4),
    q("out_yms_seal_intact", "YMS Gate-Out: Seal intact verified", OutboundSpecific, 3),
    q("out_yms_vehicle_status", "YMS Gate-Out: Vehicle Status recorded", OutboundSpecific, 1),
    q("out_yms_load_type", "YMS Gate-Out: Load Type (if applicable) recorded", OutboundSpecific, 1),
    q("out_yms_store_numbers", "YMS Gate-Out: Store Number(s) recorded", OutboundSpecific, 4),
    q("out_yms_route_number", "YMS Gate-Out: Route Number recorded", OutboundSpecific, 4),
    q("out_take_required_pics", "Takes all required pictures on outbound in YMS", OutboundSpecific, 3),
    q("out_check_rear_store_number", "Checks rear of trailer to identify store number", OutboundSpecific, 2),
    q("out_check_fuel_gauge", "Checks fuel gauge", OutboundSpecific, 2),
    q("out_fuel_requirements_kroger_jb", "Knows fuel requirements to leave for Kroger & JB Hunt delivery loads", OutboundSpecific, 3),
    q("out_verify_all_seals_against_trip_sheet", "Verifies all seals from driver and cross-references Trip Sheet seals", OutboundSpecific, 4),
    // reverse phrasing: pass means no misses
    q("out_no_missed_gate_outs", "No trailers failed to be gated out (no misses)", OutboundSpecific, 5),
];
