//! ffmpeg command line for a JPEG-over-stdin recording.

use std::ffi::OsString;
use std::path::Path;

use webcast_protocol::RecorderOptions;

/// Filter that rounds odd frame sizes down to even ones, which yuv420p needs.
const EVEN_SIZE: &str = "scale=trunc(iw/2)*2:trunc(ih/2)*2";

/// Video filter or aspect flag derived from `aspect_ratio` and `autopad`.
fn geometry_args(options: &RecorderOptions) -> Vec<String> {
	match (options.aspect_ratio_terms(), &options.autopad) {
		(Some((w, h)), Some(pad)) => {
			let ratio = format!("{w}/{h}");
			vec![
				"-vf".to_string(),
				format!("pad=max(iw\\,ih*({ratio})):ow/({ratio}):(ow-iw)/2:(oh-ih)/2:{},{EVEN_SIZE}", pad.color),
			]
		}
		(Some((w, h)), None) => vec![
			"-vf".to_string(),
			EVEN_SIZE.to_string(),
			"-aspect".to_string(),
			format!("{w}:{h}"),
		],
		(None, _) => vec!["-vf".to_string(), EVEN_SIZE.to_string()],
	}
}

/// Arguments for `ffmpeg` reading MJPEG frames on stdin and writing `output`.
pub fn ffmpeg_args(options: &RecorderOptions, output: &Path) -> Vec<OsString> {
	let fps = options.fps.max(1).to_string();
	let mut args: Vec<String> = vec![
		"-y".into(),
		"-hide_banner".into(),
		"-loglevel".into(),
		"error".into(),
		"-f".into(),
		"image2pipe".into(),
		"-vcodec".into(),
		"mjpeg".into(),
		"-framerate".into(),
		fps.clone(),
		"-i".into(),
		"-".into(),
	];

	args.extend(geometry_args(options));
	args.extend([
		"-vcodec".into(),
		options.video_codec.clone(),
		"-crf".into(),
		options.video_crf.to_string(),
		"-preset".into(),
		options.video_preset.clone(),
	]);
	if let Some(bitrate) = options.video_bitrate {
		args.extend(["-b:v".into(), format!("{bitrate}k")]);
	}
	args.extend([
		"-pix_fmt".into(),
		options.video_pixel_format.clone(),
		"-r".into(),
		fps,
	]);

	let mut args: Vec<OsString> = args.into_iter().map(OsString::from).collect();
	args.push(output.as_os_str().to_owned());
	args
}
