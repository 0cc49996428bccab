use crate::error::ConfigError;
use crate::handlers::{ErrorHandler, Outcome, ResponseHandler};
use crate::render::{valid_status, Renderer};
use crate::server::{Request, ResponseWriter};
use crate::typed::{SlotKind, SlotType, SlotValue};
use tracing::debug;

const MAX_RETURN_SLOTS: usize = 3;

/// Positions of the error, status and body slots, plus the bound renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReturnPlan {
    error_slot: Option<usize>,
    status_slot: Option<usize>,
    body_slot: Option<usize>,
    renderer: Option<Renderer>,
}

impl ReturnPlan {
    pub(crate) fn resolve(slots: &[SlotType]) -> Result<Self, ConfigError> {
        if slots.len() > MAX_RETURN_SLOTS {
            return Err(ConfigError::TooManyReturns { count: slots.len() });
        }

        let mut plan = ReturnPlan::default();
        let mut body_kind = None;
        for (idx, slot) in slots.iter().enumerate() {
            match slot.kind() {
                SlotKind::Error if plan.error_slot.is_some() => {
                    return Err(ConfigError::MultipleErrorReturns)
                }
                SlotKind::Error => plan.error_slot = Some(idx),
                SlotKind::Status if plan.status_slot.is_some() => {
                    return Err(ConfigError::MultipleStatusReturns)
                }
                SlotKind::Status => plan.status_slot = Some(idx),
                SlotKind::Body(_) if plan.body_slot.is_some() => {
                    return Err(ConfigError::MultipleBodyReturns)
                }
                SlotKind::Body(kind) => {
                    plan.body_slot = Some(idx);
                    body_kind = Some(kind);
                }
            }
        }
        plan.renderer = body_kind.map(|kind| Renderer::for_kind(kind, plan.error_slot.is_some()));

        // O1: Return plan resolved
        debug!(
            slots = slots.len(),
            error_slot = ?plan.error_slot,
            status_slot = ?plan.status_slot,
            body_slot = ?plan.body_slot,
            renderer = ?plan.renderer,
            "Handler returns resolved"
        );
        Ok(plan)
    }

    #[must_use]
    pub fn error_slot(&self) -> Option<usize> {
        self.error_slot
    }

    #[must_use]
    pub fn status_slot(&self) -> Option<usize> {
        self.status_slot
    }

    #[must_use]
    pub fn body_slot(&self) -> Option<usize> {
        self.body_slot
    }

    #[must_use]
    pub fn renderer(&self) -> Option<Renderer> {
        self.renderer
    }

    /// Split invocation results into an [`Outcome`].
    pub(crate) fn outcome(&self, values: Vec<SlotValue>) -> Outcome {
        let mut outcome = Outcome::default();
        for value in values {
            match value {
                SlotValue::Error(err) => outcome.error = err,
                SlotValue::Status(code) => outcome.status = valid_status(code),
                SlotValue::Body(body) => outcome.body = Some(body),
                SlotValue::Absent => {}
            }
        }
        outcome
    }

    /// Write the response for one invocation's results.
    ///
    /// A non-nil error wins over everything else. A body the renderer leaves
    /// unhandled, or no body at all, yields a bare response at the status slot's
    /// value (200 when unset).
    pub(crate) fn respond(
        &self,
        values: Vec<SlotValue>,
        w: &ResponseWriter,
        r: &Request,
        errors: &dyn ErrorHandler,
        responder: Option<&dyn ResponseHandler>,
    ) {
        let outcome = self.outcome(values);

        if let Some(responder) = responder {
            responder.handle_response(w, r, outcome);
            return;
        }

        if let Some(err) = outcome.error {
            errors.handle_error(w, r, err);
            return;
        }

        let handled = match (outcome.body, self.renderer) {
            (Some(body), Some(renderer)) => renderer.render(body, outcome.status, w, r, errors),
            _ => false,
        };
        if !handled {
            w.write_header(outcome.status.unwrap_or(200));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::handlers::DefaultErrorHandler;
    use crate::render::{JsonResponse, ResponseBody};
    use crate::server::RecordedResponse;
    use crate::typed::{RendererKind, Returns};

    fn respond(plan: &ReturnPlan, values: Vec<SlotValue>) -> RecordedResponse {
        let w = ResponseWriter::new();
        let r = Request::builder().build().unwrap();
        plan.respond(values, &w, &r, &DefaultErrorHandler, None);
        w.finish()
    }

    #[test]
    fn test_duplicate_slots_rejected() {
        let two_errors = [SlotType::error::<ApiError>(), SlotType::error::<ApiError>()];
        assert_eq!(
            ReturnPlan::resolve(&two_errors).unwrap_err(),
            ConfigError::MultipleErrorReturns
        );
        let two_codes = [SlotType::status::<i32>(), SlotType::status::<u16>()];
        assert_eq!(
            ReturnPlan::resolve(&two_codes).unwrap_err(),
            ConfigError::MultipleStatusReturns
        );
        let two_bodies = [
            SlotType::body::<Vec<u8>>(RendererKind::Bytes),
            SlotType::body::<String>(RendererKind::Generic),
        ];
        assert_eq!(
            ReturnPlan::resolve(&two_bodies).unwrap_err(),
            ConfigError::MultipleBodyReturns
        );
    }

    #[test]
    fn test_four_slots_rejected() {
        let slots = <(Vec<u8>, i32, String, i64)>::slot_types();
        assert_eq!(
            ReturnPlan::resolve(&slots).unwrap_err(),
            ConfigError::TooManyReturns { count: 4 }
        );
    }

    #[test]
    fn test_dynamic_renderer_depends_on_error_slot() {
        let alone = [SlotType::body::<()>(RendererKind::Dynamic)];
        assert_eq!(
            ReturnPlan::resolve(&alone).unwrap().renderer(),
            Some(Renderer::Dynamic)
        );
        let with_error = [
            SlotType::body::<()>(RendererKind::Dynamic),
            SlotType::error::<ApiError>(),
        ];
        assert_eq!(
            ReturnPlan::resolve(&with_error).unwrap().renderer(),
            Some(Renderer::DynamicAsData)
        );
    }

    #[test]
    fn test_no_returns_is_bare_200() {
        let plan = ReturnPlan::resolve(&[]).unwrap();
        let res = respond(&plan, Vec::new());
        assert_eq!(res.status, 200);
        assert!(res.body.is_empty());
    }

    #[test]
    fn test_status_only_and_invalid_status() {
        let plan = ReturnPlan::resolve(&[SlotType::status::<i32>()]).unwrap();
        assert_eq!(respond(&plan, vec![SlotValue::Status(201)]).status, 201);
        assert_eq!(respond(&plan, vec![SlotValue::Status(0)]).status, 200);
        assert_eq!(respond(&plan, vec![SlotValue::Status(-4)]).status, 200);
    }

    #[test]
    fn test_error_wins_over_body() {
        let plan = ReturnPlan::resolve(&[
            SlotType::body::<JsonResponse>(RendererKind::Envelope),
            SlotType::error::<ApiError>(),
        ])
        .unwrap();
        let res = respond(
            &plan,
            vec![
                SlotValue::Absent,
                SlotValue::Error(Some(ApiError::new(409, "taken").into())),
            ],
        );
        assert_eq!(res.status, 409);
        assert_eq!(res.body_str(), "taken");
    }

    #[test]
    fn test_unhandled_body_falls_back_to_status() {
        let plan = ReturnPlan::resolve(&[
            SlotType::body::<Option<Box<JsonResponse>>>(RendererKind::EnvelopePtr),
            SlotType::status::<i32>(),
        ])
        .unwrap();
        let res = respond(
            &plan,
            vec![
                SlotValue::Body(ResponseBody::EnvelopePtr(None)),
                SlotValue::Status(202),
            ],
        );
        assert_eq!(res.status, 202);
        assert!(res.body.is_empty());
    }

    #[test]
    fn test_response_handler_sees_outcome() {
        struct Capture;
        impl ResponseHandler for Capture {
            fn handle_response(&self, w: &ResponseWriter, _r: &Request, outcome: Outcome) {
                assert!(outcome.error.is_none());
                w.write_header(outcome.status.unwrap_or(0) + 1);
            }
        }
        let plan = ReturnPlan::resolve(&[SlotType::status::<i32>()]).unwrap();
        let w = ResponseWriter::new();
        let r = Request::builder().build().unwrap();
        plan.respond(
            vec![SlotValue::Status(300)],
            &w,
            &r,
            &DefaultErrorHandler,
            Some(&Capture),
        );
        assert_eq!(w.finish().status, 301);
    }
}
