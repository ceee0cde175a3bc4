//! The per-request state machine that runs the middleware.

use crate::error::{find_abort, Abort, ErrorResponse, WaypointError};
use crate::files::FileReader;
use crate::middleware::{ErrorHandler, Middleware, Output};
use crate::{Request, Response};
use std::pin::Pin;

lazy_static::lazy_static! {
    static ref JSON_UTF_8: mime::Mime = "application/json; charset=utf-8".parse().unwrap();
}

enum State {
    /// Running the middleware at the index.
    Running(usize),
    /// The chain was abandoned because of the given error.
    ProcessingErrors(anyhow::Error),
    Terminated,
}

pub(crate) struct Pipeline<'r> {
    middleware: &'r [Pin<Box<dyn Middleware>>],
    handlers: &'r [Pin<Box<dyn ErrorHandler>>],
    files: &'r dyn FileReader,
    errors: Vec<anyhow::Error>,
}

impl<'r> Pipeline<'r> {
    pub(crate) fn new(
        middleware: &'r [Pin<Box<dyn Middleware>>],
        handlers: &'r [Pin<Box<dyn ErrorHandler>>],
        files: &'r dyn FileReader,
    ) -> Self {
        Pipeline {
            middleware,
            handlers,
            files,
            errors: vec![],
        }
    }

    pub(crate) async fn run(mut self, request: &mut Request, response: &mut Response) {
        let mut state = State::Running(0);
        loop {
            state = match state {
                State::Running(index) => self.step(index, request, response).await,
                State::ProcessingErrors(trigger) => {
                    self.process_errors(trigger, request, response).await;
                    State::Terminated
                }
                State::Terminated => break,
            };
        }
    }

    async fn step(&mut self, index: usize, request: &mut Request, response: &mut Response) -> State {
        let middleware = match self.middleware.get(index) {
            Some(middleware) => middleware,
            None => return State::ProcessingErrors(Abort::from(WaypointError::UnhandledRoute).into()),
        };

        match middleware.as_ref().apply(request, response).await {
            Ok(Output::Next) if response.is_sent() => State::Terminated,
            Ok(Output::Next) => State::Running(index + 1),
            Ok(output) => match self.resolve(output, response).await {
                Ok(()) => State::Terminated,
                Err(error) if is_already_sent(&error) => {
                    log::error!(
                        "middleware #{} ({:?}) produced output after the response was sent",
                        index,
                        middleware
                    );
                    State::Terminated
                }
                Err(error) => self.fail(error, index),
            },
            Err(error) if response.is_sent() => {
                log::debug!("middleware #{} failed after sending the response: {:#}", index, error);
                State::ProcessingErrors(error)
            }
            Err(error) => self.fail(error, index),
        }
    }

    fn fail(&mut self, error: anyhow::Error, index: usize) -> State {
        if find_abort(&error).is_some() {
            State::ProcessingErrors(error)
        } else {
            log::debug!("middleware #{} failed, continuing: {:#}", index, error);
            self.errors.push(error);
            State::Running(index + 1)
        }
    }

    async fn resolve(&self, output: Output, response: &mut Response) -> Result<(), anyhow::Error> {
        match output {
            Output::Next => Ok(()),
            Output::Text { body, mime } => Ok(response.send(body, &mime)?),
            Output::Data { body, mime } => Ok(response.send(body, &mime)?),
            Output::File(path) => {
                if response.is_sent() {
                    return Err(WaypointError::AlreadySent.into());
                }
                let body = match self.files.read_entire_file(&path).await {
                    Ok(body) => body,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        log::debug!("file {:?} not found", path);
                        return Err(Abort::from(WaypointError::AssetNotFound).into());
                    }
                    Err(e) => return Err(e.into()),
                };
                let mime = mime_guess::from_path(&path).first_or_octet_stream();
                Ok(response.send(body, &mime)?)
            }
        }
    }

    async fn process_errors(
        &mut self,
        trigger: anyhow::Error,
        request: &mut Request,
        response: &mut Response,
    ) {
        let (status, body) = match find_abort(&trigger) {
            Some(abort) => (abort.status(), abort.to_response()),
            None => (
                http::StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: ErrorResponse::UNKNOWN.to_owned(),
                    code: None,
                },
            ),
        };

        self.errors.push(trigger);
        let errors = &self.errors[..];

        {
            let request: &Request = request;
            let observed: &Response = response;
            futures::future::join_all(
                self.handlers
                    .iter()
                    .map(|handler| handler.as_ref().handle(errors, request, observed)),
            )
            .await;
        }

        if response.is_sent() {
            log::warn!("the response was sent before the error could be written");
            return;
        }

        let body = match serde_json::to_vec(&body) {
            Ok(body) => body,
            Err(e) => {
                log::error!("could not serialize the error response: {}", e);
                Vec::new()
            }
        };

        response.set_status(status);
        if let Err(e) = response.send(body, &JSON_UTF_8) {
            log::error!("could not write the error response: {}", e);
        }
    }
}

fn is_already_sent(error: &anyhow::Error) -> bool {
    matches!(
        error.downcast_ref::<WaypointError>(),
        Some(WaypointError::AlreadySent)
    )
}
