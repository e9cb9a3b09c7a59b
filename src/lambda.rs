#[cfg(feature = "lambda")]
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
#[cfg(feature = "lambda")]
use proxilink::app::push_function::{handle, HttpEvent, HttpResponse};
#[cfg(feature = "lambda")]
use proxilink::core::webpush::VapidSigner;
#[cfg(feature = "lambda")]
use proxilink::utils::{logger, validation::Validate};
#[cfg(feature = "lambda")]
use proxilink::{BackendClient, LambdaConfig, PushDispatcher, Result, WebPushTransport};

#[cfg(feature = "lambda")]
fn build_dispatcher() -> Result<PushDispatcher<BackendClient, WebPushTransport>> {
    // 從環境變數建立配置
    let config = LambdaConfig::from_env()?;
    config.validate()?;

    let signer = VapidSigner::from_base64(
        &config.vapid_public_key,
        &config.vapid_private_key,
        &config.vapid_subject,
    )?;
    let transport = WebPushTransport::new(signer, config.ttl_seconds, config.timeout())?;
    let store = BackendClient::new(&config.backend_url, &config.service_key, config.timeout())?;

    Ok(PushDispatcher::new(store, transport))
}

#[cfg(feature = "lambda")]
async fn function_handler(event: LambdaEvent<HttpEvent>) -> std::result::Result<HttpResponse, Error> {
    tracing::info!("📨 send-push-notification invoked ({})", event.payload.method());

    let response = handle(&event.payload, build_dispatcher()).await;

    tracing::info!("send-push-notification finished with {}", response.status_code);
    Ok(response)
}

#[cfg(feature = "lambda")]
#[tokio::main]
async fn main() -> std::result::Result<(), Error> {
    logger::init_lambda_logger();

    run(service_fn(function_handler)).await
}
